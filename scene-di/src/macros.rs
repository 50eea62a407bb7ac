//! Macros for terse registration.
//!
//! - [`register!`]: one registration on an existing container
//! - [`container!`]: build a container from a list of registrations
//!
//! # Example
//! ```
//! use scene_di::{container, register, Construct, Container, Error, Shared};
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct SystemClock;
//!
//! impl Clock for SystemClock {
//!     fn now(&self) -> u64 {
//!         1
//!     }
//! }
//!
//! impl Construct for SystemClock {
//!     fn construct(_container: &Container) -> Result<Self, Error> {
//!         Ok(SystemClock)
//!     }
//! }
//!
//! let container = container! {
//!     register(dyn Clock => SystemClock)
//!     register(value String::from("main"))
//! }
//! .unwrap();
//!
//! register!(container, default Vec<u8>).unwrap();
//!
//! assert_eq!(container.resolve::<dyn Clock>().unwrap().now(), 1);
//! assert!(container.resolve::<Vec<u8>>().unwrap().is_empty());
//! ```

/// Registers one capability on a container, returning `Result<(), Error>`.
///
/// - `dyn Trait => Impl`: `Impl: Construct` published as `dyn Trait`
/// - `instance Capability => shared`: a pre-built `Shared<Capability>`
/// - `value expr`: a pre-built value registered under its own type
/// - `default Type`: `Type: Default`, built on first resolution
/// - `Type`: `Type: Construct`, built on first resolution
#[macro_export]
macro_rules! register {
    ($container:expr, dyn $capability:path => $implementation:ty) => {
        $container.register_as::<dyn $capability, $implementation>(|value| value)
    };

    ($container:expr, instance $capability:ty => $instance:expr) => {
        $container.register_instance::<$capability>($instance)
    };

    ($container:expr, value $value:expr) => {
        $container.register_value($value)
    };

    ($container:expr, default $type:ty) => {
        $container.register_default::<$type>()
    };

    ($container:expr, $type:ty) => {
        $container.register_type::<$type>()
    };
}

/// Builds a container from `register(..)` entries, returning `Result<Container, Error>`.
///
/// Stops at the first failing registration.
#[macro_export]
macro_rules! container {
    (
        $(
            register( $($entry:tt)* )
        )*
    ) => {{
        (|| -> ::core::result::Result<$crate::Container, $crate::Error> {
            let container = $crate::Container::new();

            $(
                $crate::register!(container, $($entry)*)?;
            )*

            Ok(container)
        })()
    }};
}

#[cfg(test)]
mod tests {
    use crate::{Construct, Container, Error, ErrorKind, Shared};

    trait Engine: Send + Sync {
        fn power(&self) -> u32;
    }

    struct Diesel;

    impl Engine for Diesel {
        fn power(&self) -> u32 {
            300
        }
    }

    impl Construct for Diesel {
        fn construct(_container: &Container) -> Result<Self, Error> {
            Ok(Diesel)
        }
    }

    struct Truck {
        engine: Shared<dyn Engine>,
    }

    impl Construct for Truck {
        fn construct(container: &Container) -> Result<Self, Error> {
            Ok(Self {
                engine: container.resolve::<dyn Engine>()?,
            })
        }
    }

    #[derive(Default)]
    struct Garage {
        slots: usize,
    }

    #[test]
    fn container_macro_registers_every_entry() {
        let wheels: Shared<u8> = Shared::new(18);

        let container = container! {
            register(dyn Engine => Diesel)
            register(Truck)
            register(default Garage)
            register(instance u8 => wheels.clone())
            register(value String::from("depot"))
        }
        .unwrap();

        assert_eq!(container.resolve::<Truck>().unwrap().engine.power(), 300);
        assert_eq!(container.resolve::<Garage>().unwrap().slots, 0);
        assert!(Shared::ptr_eq(&container.resolve::<u8>().unwrap(), &wheels));
        assert_eq!(*container.resolve::<String>().unwrap(), "depot");
    }

    #[test]
    fn container_macro_stops_on_duplicate() {
        let result = container! {
            register(dyn Engine => Diesel)
            register(dyn Engine => Diesel)
        };

        assert_eq!(result.unwrap_err().kind, ErrorKind::DuplicateRegistration);
    }

    #[test]
    fn register_macro_on_existing_container() {
        let container = Container::new();
        register!(container, Diesel).unwrap();
        assert!(container.is_registered::<Diesel>());
    }
}
