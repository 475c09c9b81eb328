pub mod byte_stream;
pub mod reassembler;

// -- Re-export structs for more concise usage

pub use byte_stream::{ByteStream, Reader, Writer};
pub use reassembler::Reassembler;
