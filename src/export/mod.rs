//! Artifact store: checksummed binary persistence of models and arrays

mod serializer;

pub use serializer::{
    load_array, load_object, load_object_with_metadata, save_array, save_object,
    save_object_with_metadata, ModelMetadata, SerializedObject,
};
