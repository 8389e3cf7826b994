//! First encoder pass: counts how often each identity-bearing allocation is
//! reached, and resolves every extension to the form it will be written in.

use std::collections::HashMap;

use crate::adaptor::AdaptorRegistry;
use crate::error::CoderError;
use crate::options::CoderOptions;
use crate::value::{Extension, SerializedObject, TypedArray, Value};

#[derive(Clone)]
pub(crate) enum ExtensionForm {
    Adapted {
        type_name: String,
        representation: Value,
    },
    Serialized(SerializedObject),
}

#[derive(Default)]
pub(crate) struct ReferenceCensus {
    visits: HashMap<usize, u32>,
    extensions: HashMap<usize, ExtensionForm>,
}

impl ReferenceCensus {
    pub(crate) fn take(
        value: &Value,
        registry: &AdaptorRegistry,
        options: &CoderOptions,
    ) -> Result<Self, CoderError> {
        let mut census = Self::default();
        census.visit(value, registry, options, 0)?;
        Ok(census)
    }

    /// `true` when the allocation is reached from more than one place.
    pub(crate) fn is_shared(&self, identity: usize) -> bool {
        self.visits.get(&identity).is_some_and(|&n| n > 1)
    }

    pub(crate) fn extension_form(&self, ext: &Extension) -> Option<&ExtensionForm> {
        self.extensions.get(&ext.identity())
    }

    pub(crate) fn shared_count(&self) -> usize {
        self.visits.values().filter(|&&n| n > 1).count()
    }

    fn visit(
        &mut self,
        value: &Value,
        registry: &AdaptorRegistry,
        options: &CoderOptions,
        depth: usize,
    ) -> Result<(), CoderError> {
        if let Some(identity) = tracked_identity(value, options) {
            let visits = self.visits.entry(identity).or_insert(0);
            *visits += 1;
            // Cycles stop here too.
            if *visits > 1 {
                return Ok(());
            }
        }
        let is_compound = matches!(
            value,
            Value::Array(_) | Value::Map(_) | Value::TypedArray(_) | Value::Extension(_)
        );
        if is_compound && depth >= options.max_depth {
            return Err(CoderError::DepthLimit(options.max_depth));
        }
        match value {
            Value::Array(items) => {
                for item in items.borrow().iter() {
                    self.visit(item, registry, options, depth + 1)?;
                }
            }
            Value::Map(map) => {
                for item in map.borrow().values() {
                    self.visit(item, registry, options, depth + 1)?;
                }
            }
            Value::TypedArray(array) => {
                if let TypedArray::Object { items, .. } = &*array.borrow() {
                    for item in items {
                        self.visit(item, registry, options, depth + 1)?;
                    }
                }
            }
            Value::Extension(ext) => {
                let form = resolve_extension(ext, registry)?;
                if let ExtensionForm::Adapted { representation, .. } = &form {
                    self.visit(representation, registry, options, depth + 1)?;
                }
                self.extensions.insert(ext.identity(), form);
            }
            _ => {}
        }
        Ok(())
    }
}

/// Identity used for reference tracking, if `value` takes part in it.
pub(crate) fn tracked_identity(value: &Value, options: &CoderOptions) -> Option<usize> {
    match value {
        Value::String(_) if !options.track_string_identity => None,
        _ => value.identity(),
    }
}

fn resolve_extension(
    ext: &Extension,
    registry: &AdaptorRegistry,
) -> Result<ExtensionForm, CoderError> {
    if let Some(entry) = registry.lookup_type(ext.native_type_id()) {
        if let Some(representation) = entry.represent(ext.native()) {
            return Ok(ExtensionForm::Adapted {
                type_name: entry.name().to_string(),
                representation,
            });
        }
    }
    match ext.serialize() {
        Some(bytes) => Ok(ExtensionForm::Serialized(SerializedObject::new(bytes?))),
        None => Err(CoderError::UnsupportedType(ext.type_name().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn census(value: &Value) -> ReferenceCensus {
        ReferenceCensus::take(
            value,
            &AdaptorRegistry::with_standard_adaptors(),
            &CoderOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn counts_shared_allocations() {
        let shared = Value::array(vec![Value::from(1)]);
        let root = Value::array(vec![shared.clone(), shared.clone(), Value::array(vec![])]);
        let census = census(&root);
        assert!(census.is_shared(shared.identity().unwrap()));
        assert!(!census.is_shared(root.identity().unwrap()));
        assert_eq!(census.shared_count(), 1);
    }

    #[test]
    fn cycles_terminate() {
        let list = Value::array(vec![]);
        if let Value::Array(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        let census = census(&list);
        assert!(census.is_shared(list.identity().unwrap()));
    }

    #[test]
    fn string_tracking_can_be_disabled() {
        let s = Value::from("QV01");
        let root = Value::array(vec![s.clone(), s.clone()]);
        let options = CoderOptions {
            track_string_identity: false,
            ..CoderOptions::default()
        };
        let census = ReferenceCensus::take(&root, &AdaptorRegistry::new(), &options).unwrap();
        assert_eq!(census.shared_count(), 0);
    }

    #[test]
    fn unregistered_extension_is_rejected() {
        #[derive(Debug, PartialEq)]
        struct Opaque;
        let err = ReferenceCensus::take(
            &Value::extension(Opaque),
            &AdaptorRegistry::new(),
            &CoderOptions::default(),
        )
        .err();
        assert!(matches!(err, Some(CoderError::UnsupportedType(name)) if name.ends_with("Opaque")));
    }

    #[test]
    fn depth_limit() {
        let mut value = Value::Null;
        for _ in 0..4 {
            value = Value::array(vec![value]);
        }
        let options = CoderOptions {
            max_depth: 3,
            ..CoderOptions::default()
        };
        let err = ReferenceCensus::take(&value, &AdaptorRegistry::new(), &options).err();
        assert_eq!(err, Some(CoderError::DepthLimit(3)));
    }
}
