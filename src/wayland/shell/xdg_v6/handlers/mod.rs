mod positioner;
mod shell;
mod surface;
mod toplevel;

pub use self::positioner::XdgPositionerUserData;
pub use self::shell::XdgShellUserData;
pub use self::surface::{XdgPopupUserData, XdgSurfaceUserData};
pub use self::toplevel::XdgToplevelUserData;
