//! The display-server operations a [`Session`](crate::session::Session) needs
//!
//! The Wayland implementation lives in [`crate::client`]. Keeping the session
//! behind this trait lets the buffer lifecycle run against a recording
//! implementation in tests.

use crate::buffer::{BufferError, BufferLayout};
use std::os::fd::BorrowedFd;

pub trait Presenter {
    /// Compositor-side handle for one registered buffer
    type Buffer;

    /// Share `fd` with the compositor and create a buffer described by `layout`.
    fn create_buffer(
        &mut self,
        fd: BorrowedFd<'_>,
        layout: &BufferLayout,
    ) -> Result<Self::Buffer, BufferError>;

    /// Release a buffer previously returned by [`Presenter::create_buffer`].
    fn destroy_buffer(&mut self, buffer: Self::Buffer);

    /// Attach `buffer` at the origin, damage all of it and commit.
    fn present(&mut self, buffer: &Self::Buffer, layout: &BufferLayout);

    /// Ask for a frame callback on the next commit.
    fn request_frame(&mut self);
}
