//! Radiance HDR environment map loader

use std::rc::Rc;

use crate::error::ResourceError;

use super::{
    resource::{CompletionSender, EnvironmentImage, LoadEvent, ResourceKind},
    source::AssetSource,
};

/// Decodes an RGBE (`.hdr`) panorama into linear RGBA32F texels
pub fn decode_environment(uri: &str, bytes: &[u8]) -> Result<EnvironmentImage, ResourceError> {
    let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Hdr)
        .map_err(|e| ResourceError::decode(uri, e))?;
    let rgba = image.to_rgba32f();
    Ok(EnvironmentImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

pub async fn load_environment(source: Rc<dyn AssetSource>, uri: String, events: CompletionSender) {
    let event = match source
        .fetch(&uri, Box::new(|_, _| {}))
        .await
        .and_then(|bytes| decode_environment(&uri, &bytes))
    {
        Ok(image) => LoadEvent::EnvironmentLoaded { uri, image },
        Err(error) => LoadEvent::Failed {
            kind: ResourceKind::Environment,
            error,
        },
    };
    events.send(event);
}
