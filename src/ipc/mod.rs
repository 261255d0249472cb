//! IPC listener that accepts commands over a Unix socket.
//!
//! External tools (scripts, key-bind helpers, a compositor plugin reporting
//! drags) connect to the socket and send newline-delimited JSON commands.

pub mod listener;
