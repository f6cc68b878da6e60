//! Run-wide configuration values that are set once and read everywhere.
//!
//! A global property is declared with `define_global_property!`, which creates a key type whose
//! associated `Value` is stored in the context. Values may be validated on the way in and can be
//! loaded from a JSON file whose top-level object is keyed by property name:
//!
//! ```json
//! { "EpisimParameters": { "calibration_parameter": 0.000002, "sample_size": 0.25 } }
//! ```
use std::any::{Any, TypeId};
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::EpisimError;
use crate::hashing::HashMap;

/// Defines a global property with the following parameters:
/// * `$global_property`: Name for the identifier type of the global property
/// * `$value`: The type of the property's value
/// * `$validate`: A function (or closure) that checks the validity of the property (optional)
#[macro_export]
macro_rules! define_global_property {
    ($global_property:ident, $value:ty, $validate: expr) => {
        #[derive(Copy, Clone)]
        pub struct $global_property;

        impl $crate::global_properties::GlobalProperty for $global_property {
            type Value = $value;

            fn name() -> &'static str {
                stringify!($global_property)
            }

            fn validate(val: &$value) -> Result<(), $crate::error::EpisimError> {
                $validate(val)
            }
        }
    };

    ($global_property: ident, $value: ty) => {
        $crate::define_global_property!($global_property, $value, |_| { Ok(()) });
    };
}
pub use define_global_property;

pub trait GlobalProperty: Any + Copy {
    type Value: Any + DeserializeOwned;

    /// Key under which the property appears in a properties file.
    fn name() -> &'static str;

    /// Checks a value before it is stored.
    ///
    /// # Errors
    ///
    /// Returns an `EpisimError` describing why the value was rejected.
    fn validate(value: &Self::Value) -> Result<(), EpisimError>;
}

define_data_plugin!(
    GlobalPropertiesPlugin,
    HashMap<TypeId, Box<dyn Any>>,
    HashMap::default()
);

pub trait ContextGlobalPropertiesExt {
    /// Sets the value of a global property. Each property can be set once per run.
    ///
    /// # Errors
    ///
    /// Fails if the value does not validate or the property already has a value.
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        property: T,
        value: T::Value,
    ) -> Result<(), EpisimError>;

    /// Returns the value of a global property, if it has been set.
    fn get_global_property_value<T: GlobalProperty>(&self, property: T) -> Option<&T::Value>;

    /// Reads `T::name()` out of the JSON object stored at `path` and sets it.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, if it has no entry for the property,
    /// or if `set_global_property_value` fails.
    fn load_global_property<T: GlobalProperty>(
        &mut self,
        property: T,
        path: &Path,
    ) -> Result<(), EpisimError>;
}

impl ContextGlobalPropertiesExt for Context {
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        _property: T,
        value: T::Value,
    ) -> Result<(), EpisimError> {
        T::validate(&value)?;
        let properties = self.get_data_mut(GlobalPropertiesPlugin);
        if properties.contains_key(&TypeId::of::<T>()) {
            return Err(EpisimError::ConfigError(format!(
                "global property {} has already been set",
                T::name()
            )));
        }
        properties.insert(TypeId::of::<T>(), Box::new(value));
        Ok(())
    }

    fn get_global_property_value<T: GlobalProperty>(&self, _property: T) -> Option<&T::Value> {
        self.get_data(GlobalPropertiesPlugin)?
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T::Value>())
    }

    fn load_global_property<T: GlobalProperty>(
        &mut self,
        property: T,
        path: &Path,
    ) -> Result<(), EpisimError> {
        let value = read_global_property(property, path)?;
        self.set_global_property_value(property, value)
    }
}

/// Reads `T::name()` out of the JSON object stored at `path` without storing it, so the value
/// can be adjusted before it is set.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed or has no entry for the property.
pub fn read_global_property<T: GlobalProperty>(
    _property: T,
    path: &Path,
) -> Result<T::Value, EpisimError> {
    let contents = fs::read_to_string(path)?;
    let mut properties: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&contents)?;
    let raw = properties.remove(T::name()).ok_or_else(|| {
        EpisimError::ConfigError(format!(
            "{} has no entry for global property {}",
            path.display(),
            T::name()
        ))
    })?;
    Ok(serde_json::from_value(raw)?)
}
