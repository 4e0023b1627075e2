use embedded_hal::delay::DelayNs;
use mockall::mock;

mock! {
    #[derive(Debug)]
    pub Delay {}

    impl DelayNs for Delay {
        fn delay_ns(&mut self, ns: u32);
        fn delay_us(&mut self, us: u32);
        fn delay_ms(&mut self, ms: u32);
    }
}

/// Delay provider that returns immediately. For tests that only need to
/// satisfy the type, not observe timing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
