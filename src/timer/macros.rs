/// Declares a static global `METER` protected by a `critical_section` mutex.
///
/// # Arguments
/// - `$sen`: concrete type of the sensing rail enable pin (`OutputPin`)
/// - `$sys`: concrete type of the radio rail enable pin (`OutputPin`)
///
/// # Example
/// ```rust,ignore
/// init_meter!(SenPin, SysPin);
/// ```
#[macro_export]
macro_rules! init_meter {
    ( $sen:ty, $sys:ty ) => {
        pub static METER: $crate::timer::Shared<$crate::meter::Meter<$sen, $sys>> =
            $crate::timer::shared_init();
    };
}

/// Constructs a metering unit and stores it in the `METER` global declared by
/// [`init_meter!`].
///
/// # Arguments
/// - `$sen`, `$sys`: rail enable pins
/// - `$config`: optional `MeterConfig`, defaults to `MeterConfig::default()`
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     setup_meter!(sen, sys);
/// }
/// ```
#[macro_export]
macro_rules! setup_meter {
    ( $sen:expr, $sys:expr ) => {
        $crate::setup_meter!($sen, $sys, $crate::meter::MeterConfig::default())
    };
    ( $sen:expr, $sys:expr, $config:expr ) => {
        $crate::timer::shared_install(&METER, $crate::meter::Meter::new($sen, $sys, $config))
    };
}

/// Declares a static global `RADIO` protected by a `critical_section` mutex.
///
/// # Example
/// ```rust,ignore
/// init_radio!();
/// ```
#[macro_export]
macro_rules! init_radio {
    () => {
        pub static RADIO: $crate::timer::Shared<$crate::radio::RadioLink> =
            $crate::timer::shared_init();
    };
}

/// Constructs a radio link endpoint and stores it in the `RADIO` global
/// declared by [`init_radio!`].
///
/// # Example
/// ```rust,ignore
/// fn main() {
///     setup_radio!();
/// }
/// ```
#[macro_export]
macro_rules! setup_radio {
    () => {
        $crate::setup_radio!($crate::radio::RadioConfig::default())
    };
    ( $config:expr ) => {
        $crate::timer::shared_install(&RADIO, $crate::radio::RadioLink::new($config))
    };
}
