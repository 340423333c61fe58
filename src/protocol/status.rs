//! Server status flags, as carried in `OK`/`EOF` packets.

bitflags::bitflags! {
    #[derive(Default)]
    pub struct Status: u16 {
        const MORE_RESULTS_EXISTS = 0x0008;
    }
}
