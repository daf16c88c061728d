use wgpu::util::DeviceExt;

/// Typed uniform buffer holding one `Content` value.
///
/// Starts zeroed; [`update_content`](Self::update_content) skips the queue write when the
/// value is byte-identical to the last upload.
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    last_upload: Option<Content>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    pub fn new(device: &wgpu::Device, label: &str) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&Content::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        UniformBuffer {
            buffer,
            last_upload: None,
        }
    }

    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) {
        let unchanged = self
            .last_upload
            .as_ref()
            .is_some_and(|last| bytemuck::bytes_of(last) == bytemuck::bytes_of(&content));
        if unchanged {
            return;
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&content));
        self.last_upload = Some(content);
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }
}
