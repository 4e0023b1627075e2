use embedded_hal::digital::{self, ErrorType, InputPin, OutputPin};
use mockall::mock;

#[derive(Debug, Clone, Copy)]
pub struct PinError;

impl digital::Error for PinError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

mock! {
    #[derive(Debug)]
    pub OutputPin {}

    impl ErrorType for OutputPin {
        type Error = PinError;
    }

    impl OutputPin for OutputPin {
        fn set_low(&mut self) -> Result<(), PinError>;
        fn set_high(&mut self) -> Result<(), PinError>;
    }
}

mock! {
    #[derive(Debug)]
    pub InputPin {}

    impl ErrorType for InputPin {
        type Error = PinError;
    }

    impl InputPin for InputPin {
        fn is_high(&mut self) -> Result<bool, PinError>;
        fn is_low(&mut self) -> Result<bool, PinError>;
    }
}
