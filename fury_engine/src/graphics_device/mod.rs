/// Graphics device module - the boundary between the engine and a graphics API

pub mod graphics_device;
pub mod texture;
pub mod buffer;
pub mod program;
pub mod command_list;
pub mod headless;

pub use graphics_device::*;
pub use texture::*;
pub use buffer::*;
pub use program::*;
pub use command_list::*;
pub use headless::{
    Command, HeadlessBuffer, HeadlessCommandList, HeadlessDevice, HeadlessProgram, HeadlessTexture,
};
