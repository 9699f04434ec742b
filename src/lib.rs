//! Camera-seeded number generator.
//!
//! A frame is read from a video device, its raw bytes are hashed with SHA-256,
//! and the digest is reduced into a caller-supplied inclusive range:
//!
//! ```text
//! CaptureSource → FrameBuffer → hasher::hash → Digest → reducer::reduce → i32
//! ```
//!
//! [`Session`] ties these together for a UI or driver that polls previews on a
//! fixed cadence and captures on user action. The output is a deterministic
//! function of the pixels and is not suitable for cryptographic use.

pub mod capture;
pub mod frame;
pub mod hasher;
pub mod reducer;
pub mod session;

pub use capture::{CaptureError, CaptureSource, Device, DeviceError, StubDevice, WebcamDevice};
pub use frame::{FrameBuffer, PixelFormat};
pub use hasher::{hash, Digest, HashError};
pub use reducer::{reduce, Range, RangeError};
pub use session::{Session, SessionError, SessionOptions};
