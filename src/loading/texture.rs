//! Color texture loader (JPEG/PNG and anything else `image` can sniff)

use std::rc::Rc;

use crate::error::ResourceError;

use super::{
    resource::{CompletionSender, LoadEvent, ResourceKind, TextureImage},
    source::AssetSource,
};

pub fn decode_texture(uri: &str, bytes: &[u8]) -> Result<TextureImage, ResourceError> {
    let image = image::load_from_memory(bytes).map_err(|e| ResourceError::decode(uri, e))?;
    let rgba = image.to_rgba8();
    Ok(TextureImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

/// Fetches and decodes the color map. The GPU texture is created by the viewer on completion,
/// once the renderer's anisotropy limit is known.
pub async fn load_texture(source: Rc<dyn AssetSource>, uri: String, events: CompletionSender) {
    let event = match source
        .fetch(&uri, Box::new(|_, _| {}))
        .await
        .and_then(|bytes| decode_texture(&uri, &bytes))
    {
        Ok(image) => LoadEvent::TextureLoaded(image),
        Err(error) => LoadEvent::Failed {
            kind: ResourceKind::Texture,
            error,
        },
    };
    events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn test_png_decodes_to_rgba8() {
        let source = ImageBuffer::from_pixel(3, 2, Rgba([10u8, 20, 30, 255]));
        let mut png = Cursor::new(Vec::new());
        source.write_to(&mut png, ImageFormat::Png).unwrap();

        let texture = decode_texture("texture.png", png.get_ref()).unwrap();
        assert_eq!((texture.width, texture.height), (3, 2));
        assert_eq!(texture.rgba.len(), 3 * 2 * 4);
        assert_eq!(&texture.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = decode_texture("texture.jpg", b"not an image");
        assert!(matches!(result, Err(ResourceError::Decode { uri, .. }) if uri == "texture.jpg"));
    }
}
