//! Ordered release of the window and its connection

use crate::presenter::Presenter;
use crate::session::Session;
use anyhow::Result;
use log::debug;

/// Handles that outlive the session and go away with the window
pub trait WindowHandles {
    fn destroy_toplevel(&mut self);
    fn destroy_xdg_surface(&mut self);
    fn destroy_surface(&mut self);
    /// Flush outstanding requests and drop the connection.
    fn disconnect(&mut self) -> Result<()>;
}

/// Release the pixel buffer, then the top-level, xdg surface and surface,
/// then the connection.
///
/// Works whether or not the session saw a close; an event loop that ended
/// in an error goes through the same path.
pub fn release<P, W>(session: Option<Session<P>>, handles: &mut W) -> Result<()>
where
    P: Presenter,
    W: WindowHandles,
{
    if let Some(session) = session {
        drop(session.shutdown());
    }

    handles.destroy_toplevel();
    handles.destroy_xdg_surface();
    handles.destroy_surface();
    debug!("Window handles released");

    handles.disconnect()
}
