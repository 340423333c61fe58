//! Client/server capability flags.
//!
//! Bit values are as published for protocol version 10.

bitflags::bitflags! {
    #[derive(Default)]
    pub struct Capabilities: u64 {
        const LONG_PASSWORD = 1;
        const LONG_FLAG = 1 << 2;
        const CONNECT_WITH_DB = 1 << 3;
        const PROTOCOL_41 = 1 << 9;
        const TRANSACTIONS = 1 << 13;
        const SECURE_CONNECTION = 1 << 15;
        const PLUGIN_AUTH = 1 << 19;
        const DEPRECATE_EOF = 1 << 24;
    }
}

impl Capabilities {
    /// The minimum set of capabilities this client always requests,
    /// per spec.md §6.
    pub fn baseline(want_database: bool) -> Capabilities {
        let mut caps = Capabilities::PROTOCOL_41
            | Capabilities::PLUGIN_AUTH
            | Capabilities::SECURE_CONNECTION
            | Capabilities::TRANSACTIONS
            | Capabilities::LONG_PASSWORD
            | Capabilities::LONG_FLAG;

        if want_database {
            caps |= Capabilities::CONNECT_WITH_DB;
        }

        caps
    }
}
