//! Generated bindings of the `xdg-shell-unstable-v6` protocol
//!
//! The published protocol crates dropped this unstable version of the shell, so the
//! bindings are generated from the bundled `protocols/xdg-shell-unstable-v6.xml`.

#![allow(dead_code, non_camel_case_types, unused_unsafe, unused_variables)]
#![allow(non_upper_case_globals, non_snake_case, unused_imports)]
#![allow(missing_docs, clippy::all)]

pub mod server {
    //! Server-side API of this protocol
    use wayland_server;
    use wayland_server::protocol::*;

    pub mod __interfaces {
        use wayland_server::protocol::__interfaces::*;
        wayland_scanner::generate_interfaces!("protocols/xdg-shell-unstable-v6.xml");
    }
    use self::__interfaces::*;

    wayland_scanner::generate_server_code!("protocols/xdg-shell-unstable-v6.xml");
}
