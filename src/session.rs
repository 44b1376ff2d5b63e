//! Window session state machine
//!
//! The session owns the current [`PixelBuffer`] and reacts to the small,
//! closed set of events the compositor can send to a plain top-level window.
//! It is driven from the Wayland dispatch handlers through
//! [`Session::handle`], always by exclusive reference, one event at a time.
//!
//! ```text
//! Connected --Configure/Resize--> Configured --Resize--> Configured
//!     |                               |  ^
//!     |                               +--+ FrameDone
//!     +------------Close-------------+---> Closed
//! ```

use crate::buffer::{BufferError, BufferLayout, PixelBuffer};
use crate::presenter::Presenter;
use crate::render;
use log::{debug, error, info, trace};

/// Window size used until the compositor suggests one
pub const DEFAULT_WIDTH: u32 = 1367;
pub const DEFAULT_HEIGHT: u32 = 768;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Globals bound, surface created, waiting for the first configure
    Connected,
    /// At least one configure acknowledged; frames may be committed
    Configured,
    /// Close requested; every further event is ignored
    Closed,
}

/// Events the Wayland glue feeds into the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// An xdg_surface configure was acknowledged
    Configure,
    /// The top-level suggested a new size; a `0` on either axis means no
    /// preference and the event is ignored
    Resize { width: u32, height: u32 },
    /// The previous frame was shown; time to draw the next
    FrameDone,
    /// The user asked for the window to close
    Close,
}

pub struct Session<P: Presenter> {
    presenter: P,
    state: SessionState,
    width: u32,
    height: u32,
    buffer: Option<PixelBuffer<P::Buffer>>,
    frames: u64,
}

impl<P: Presenter> Session<P> {
    pub fn new(presenter: P, width: u32, height: u32) -> Self {
        Self {
            presenter,
            state: SessionState::Connected,
            width,
            height,
            buffer: None,
            frames: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Layout of the current buffer, if one is mapped
    pub fn layout(&self) -> Option<&BufferLayout> {
        self.buffer.as_ref().map(|b| b.layout())
    }

    pub fn pixels(&self) -> Option<&[u8]> {
        self.buffer.as_ref().map(|b| b.pixels())
    }

    /// Number of frames handed to the compositor so far
    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Apply one event. Returns `true` if a frame was committed.
    ///
    /// Resource failures are logged and leave the session as it was; the next
    /// event that needs a buffer tries again.
    pub fn handle(&mut self, event: SessionEvent) -> bool {
        if self.is_closed() {
            trace!("Ignoring {:?} after close", event);
            return false;
        }

        match event {
            SessionEvent::Configure => {
                if self.state == SessionState::Connected {
                    info!("Surface configured at {}x{}", self.width, self.height);
                }
                self.state = SessionState::Configured;
                self.draw()
            }
            SessionEvent::Resize { width, height } => self.resize(width, height),
            SessionEvent::FrameDone => {
                if self.state != SessionState::Configured {
                    trace!("Frame callback before first configure, skipping");
                    return false;
                }
                self.presenter.request_frame();
                self.draw()
            }
            SessionEvent::Close => {
                info!("Close requested");
                self.state = SessionState::Closed;
                false
            }
        }
    }

    /// Release the buffer and hand back the presenter for teardown.
    pub fn shutdown(mut self) -> P {
        self.state = SessionState::Closed;
        if let Some(buffer) = self.buffer.take() {
            let handle = buffer.into_handle();
            self.presenter.destroy_buffer(handle);
        }
        debug!("Session shut down after {} frames", self.frames);
        self.presenter
    }

    fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            trace!("Resize {}x{} carries no size preference, ignored", width, height);
            return false;
        }

        if (width, height) == (self.width, self.height) && self.buffer.is_some() {
            trace!("Resize to current size {}x{} ignored", width, height);
            return false;
        }

        // Build the replacement completely before touching the old buffer
        let replacement = match PixelBuffer::allocate(&mut self.presenter, width, height) {
            Ok(buffer) => buffer,
            Err(e) => {
                error!("Failed to resize buffer to {}x{}: {}", width, height, e);
                return false;
            }
        };

        if let Some(old) = self.buffer.take() {
            let handle = old.into_handle();
            self.presenter.destroy_buffer(handle);
        }

        if self.state == SessionState::Connected {
            info!("Surface configured at {}x{}", width, height);
        } else {
            debug!(
                "Resized {}x{} -> {}x{}",
                self.width, self.height, width, height
            );
        }
        self.buffer = Some(replacement);
        self.width = width;
        self.height = height;
        self.state = SessionState::Configured;

        self.draw()
    }

    /// Render the gradient into the current buffer and commit it.
    fn draw(&mut self) -> bool {
        if let Err(e) = self.ensure_buffer() {
            error!(
                "Skipping frame, no buffer for {}x{}: {}",
                self.width, self.height, e
            );
            return false;
        }

        let Some(buffer) = self.buffer.as_mut() else {
            return false;
        };

        let layout = *buffer.layout();
        render::draw_gradient(buffer.pixels_mut(), &layout);
        self.presenter.present(buffer.handle(), &layout);
        self.frames += 1;

        trace!("Frame {} committed", self.frames);
        true
    }

    fn ensure_buffer(&mut self) -> Result<(), BufferError> {
        if self.buffer.is_none() {
            self.buffer = Some(PixelBuffer::allocate(
                &mut self.presenter,
                self.width,
                self.height,
            )?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::BorrowedFd;

    #[derive(Debug, Default)]
    struct CountingPresenter {
        created: u32,
        destroyed: u32,
        presented: u32,
        frame_requests: u32,
        fail_create: bool,
    }

    impl Presenter for CountingPresenter {
        type Buffer = u32;

        fn create_buffer(
            &mut self,
            _fd: BorrowedFd<'_>,
            layout: &BufferLayout,
        ) -> Result<u32, BufferError> {
            if self.fail_create {
                return Err(BufferError::InvalidLayout {
                    width: layout.width,
                    height: layout.height,
                });
            }
            self.created += 1;
            Ok(self.created)
        }

        fn destroy_buffer(&mut self, _buffer: u32) {
            self.destroyed += 1;
        }

        fn present(&mut self, _buffer: &u32, _layout: &BufferLayout) {
            self.presented += 1;
        }

        fn request_frame(&mut self) {
            self.frame_requests += 1;
        }
    }

    fn session(width: u32, height: u32) -> Session<CountingPresenter> {
        Session::new(CountingPresenter::default(), width, height)
    }

    #[test]
    fn test_starts_connected_without_buffer() {
        let s = session(32, 16);
        assert_eq!(s.state(), SessionState::Connected);
        assert!(s.layout().is_none());
        assert_eq!(s.frames_presented(), 0);
    }

    #[test]
    fn test_frame_done_before_configure_is_ignored() {
        let mut s = session(32, 16);
        assert!(!s.handle(SessionEvent::FrameDone));
        assert_eq!(s.presenter().frame_requests, 0);
        assert_eq!(s.presenter().created, 0);
    }

    #[test]
    fn test_configure_allocates_once() {
        let mut s = session(32, 16);
        assert!(s.handle(SessionEvent::Configure));
        assert!(s.handle(SessionEvent::Configure));

        assert_eq!(s.state(), SessionState::Configured);
        assert_eq!(s.presenter().created, 1);
        assert_eq!(s.presenter().presented, 2);
    }

    #[test]
    fn test_frame_done_requests_next_frame_and_draws() {
        let mut s = session(32, 16);
        s.handle(SessionEvent::Configure);
        assert!(s.handle(SessionEvent::FrameDone));

        assert_eq!(s.presenter().frame_requests, 1);
        assert_eq!(s.frames_presented(), 2);
    }

    #[test]
    fn test_resize_with_a_zero_axis_is_ignored() {
        let mut s = session(32, 16);
        s.handle(SessionEvent::Configure);

        for (width, height) in [(0, 40), (40, 0), (0, 0)] {
            assert!(!s.handle(SessionEvent::Resize { width, height }));
            assert_eq!(s.size(), (32, 16));
            assert_eq!(s.layout(), Some(&BufferLayout::new(32, 16).unwrap()));
        }
        assert_eq!(s.presenter().created, 1);
        assert_eq!(s.presenter().destroyed, 0);
        assert_eq!(s.frames_presented(), 1);
    }

    #[test]
    fn test_zero_resize_before_configure_allocates_nothing() {
        let mut s = session(32, 16);
        assert!(!s.handle(SessionEvent::Resize { width: 0, height: 0 }));
        assert_eq!(s.state(), SessionState::Connected);
        assert_eq!(s.presenter().created, 0);

        // The configure that follows allocates at the default size
        assert!(s.handle(SessionEvent::Configure));
        assert_eq!(s.layout(), Some(&BufferLayout::new(32, 16).unwrap()));
    }

    #[test]
    fn test_resize_to_same_size_is_noop() {
        let mut s = session(32, 16);
        s.handle(SessionEvent::Configure);
        assert!(!s.handle(SessionEvent::Resize { width: 32, height: 16 }));
        assert_eq!(s.presenter().created, 1);
    }

    #[test]
    fn test_failed_resize_keeps_previous_buffer() {
        let mut s = session(32, 16);
        s.handle(SessionEvent::Configure);
        s.presenter_mut().fail_create = true;

        assert!(!s.handle(SessionEvent::Resize { width: 64, height: 64 }));
        assert_eq!(s.size(), (32, 16));
        assert_eq!(s.layout(), Some(&BufferLayout::new(32, 16).unwrap()));
        assert_eq!(s.presenter().destroyed, 0);

        // Frames keep flowing from the old buffer
        assert!(s.handle(SessionEvent::FrameDone));
    }

    #[test]
    fn test_failed_first_allocation_skips_frame() {
        let mut s = session(32, 16);
        s.presenter_mut().fail_create = true;

        assert!(!s.handle(SessionEvent::Configure));
        assert_eq!(s.state(), SessionState::Configured);
        assert!(s.layout().is_none());

        s.presenter_mut().fail_create = false;
        assert!(s.handle(SessionEvent::FrameDone));
        assert!(s.layout().is_some());
    }

    #[test]
    fn test_events_after_close_are_ignored() {
        let mut s = session(32, 16);
        s.handle(SessionEvent::Configure);
        s.handle(SessionEvent::Close);

        assert!(s.is_closed());
        assert!(!s.handle(SessionEvent::FrameDone));
        assert!(!s.handle(SessionEvent::Resize { width: 8, height: 8 }));
        assert_eq!(s.frames_presented(), 1);
    }

    #[test]
    fn test_shutdown_releases_buffer() {
        let mut s = session(32, 16);
        s.handle(SessionEvent::Configure);
        let presenter = s.shutdown();
        assert_eq!(presenter.created, 1);
        assert_eq!(presenter.destroyed, 1);
    }
}
