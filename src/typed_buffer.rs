/*!
Typed `wgpu` buffers.

[`bytemuck`](https://docs.rs/bytemuck/latest/bytemuck/) casts Rust datatypes to
the bytes sent to the GPU. Casting at every call site is error prone; you might
create a buffer that's "supposed to" contain `A`s, but nothing will stop you from
reading it back as `B`s.

This module tags every buffer with its element type, and covers the three kinds
the engine needs: storage arrays, a single uniform value, and host-readable
copies.
*/

use std::{
    marker::PhantomData,
    mem::size_of,
    num::NonZeroU64,
    ops::Deref,
    sync::mpsc,
};

use wgpu::util::DeviceExt;

pub struct Buffer<A> {
    buffer: wgpu::Buffer,
    len: u64,
    phantom_data: PhantomData<A>,
}

impl<A: bytemuck::Pod + bytemuck::Zeroable> Buffer<A> {
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of `A`s the buffer holds.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn byte_size(&self) -> u64 {
        self.len * size_of::<A>() as u64
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    /**
    Blocks until the buffer is mapped, then copies it into `destination`.

    The buffer must have been created with [`wgpu::BufferUsages::MAP_READ`] and
    hold exactly `destination.len()` elements. `destination` is untouched when
    mapping fails.
    */
    pub fn read_into(
        &self,
        device: &wgpu::Device,
        destination: &mut [A],
    ) -> Result<(), wgpu::BufferAsyncError> {
        debug_assert_eq!(destination.len() as u64, self.len);

        let slice = Slice {
            slice: self.buffer.slice(..),
            phantom_data: PhantomData,
        };

        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        // The callback is dropped without running if the device is lost.
        receiver
            .recv()
            .unwrap_or(Err(wgpu::BufferAsyncError))?;

        destination.copy_from_slice(&slice.get_mapped_range());
        self.buffer.unmap();
        Ok(())
    }
}

struct Slice<'a, A> {
    slice: wgpu::BufferSlice<'a>,
    phantom_data: PhantomData<A>,
}

impl<'a, A> Slice<'a, A> {
    fn map_async(
        &self,
        mode: wgpu::MapMode,
        callback: impl FnOnce(Result<(), wgpu::BufferAsyncError>) + Send + 'static,
    ) {
        self.slice.map_async(mode, callback)
    }

    fn get_mapped_range(&self) -> View<'a, A> {
        View {
            view: self.slice.get_mapped_range(),
            phantom_data: PhantomData,
        }
    }
}

struct View<'a, A> {
    view: wgpu::BufferView<'a>,
    phantom_data: PhantomData<A>,
}

impl<'a, A: bytemuck::Pod + bytemuck::Zeroable> Deref for View<'a, A> {
    type Target = [A];

    fn deref(&self) -> &Self::Target {
        bytemuck::cast_slice(&*self.view)
    }
}

enum Contents<'a> {
    Contents(&'a [u8]),
    Size(u64),
}

pub struct Builder<'a, A> {
    label: Option<&'a str>,
    contents: Contents<'a>,
    usage: wgpu::BufferUsages,
    phantom_data: PhantomData<A>,
}

impl<'a, A: bytemuck::Pod + bytemuck::Zeroable> From<&'a [A]> for Builder<'a, A> {
    fn from(value: &'a [A]) -> Self {
        Self {
            label: None,
            contents: Contents::Contents(bytemuck::cast_slice(value)),
            usage: wgpu::BufferUsages::COPY_DST,
            phantom_data: PhantomData,
        }
    }
}

impl<'a, A: bytemuck::Pod + bytemuck::Zeroable> Builder<'a, A> {
    /// An uninitialised buffer of `len` elements.
    pub fn new(len: u64) -> Self {
        Self {
            label: None,
            contents: Contents::Size(len),
            usage: wgpu::BufferUsages::empty(),
            phantom_data: PhantomData,
        }
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_usage(mut self, usage: wgpu::BufferUsages) -> Self {
        self.usage |= usage;
        self
    }

    pub fn create(self, device: &wgpu::Device) -> Buffer<A> {
        let (buffer, len) = match self.contents {
            Contents::Contents(contents) => (
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: self.label,
                    contents,
                    usage: self.usage,
                }),
                (contents.len() / size_of::<A>()) as u64,
            ),
            Contents::Size(len) => (
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: self.label,
                    size: len * size_of::<A>() as u64,
                    usage: self.usage,
                    mapped_at_creation: false,
                }),
                len,
            ),
        };

        Buffer {
            buffer,
            len,
            phantom_data: PhantomData,
        }
    }
}

/// A single `A` in a uniform buffer.
pub struct Uniform<A> {
    buffer: wgpu::Buffer,
    phantom_data: PhantomData<A>,
}

impl<A: bytemuck::Pod + bytemuck::Zeroable> Uniform<A> {
    pub fn new(device: &wgpu::Device, label: &str, contents: A) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&contents),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            buffer,
            phantom_data: PhantomData,
        }
    }

    pub fn min_binding_size() -> Option<NonZeroU64> {
        NonZeroU64::new(size_of::<A>() as u64)
    }

    pub fn write(&self, queue: &wgpu::Queue, contents: A) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&contents));
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }
}

pub fn copy_buffer_to_buffer<A: bytemuck::Pod + bytemuck::Zeroable>(
    command_encoder: &mut wgpu::CommandEncoder,
    source: &Buffer<A>,
    destination: &Buffer<A>,
) {
    debug_assert_eq!(source.len(), destination.len());
    command_encoder.copy_buffer_to_buffer(
        source.buffer(),
        0,
        destination.buffer(),
        0,
        source.byte_size(),
    )
}
