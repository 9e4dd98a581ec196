/// Process exit codes.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    pub const OPERATIONAL_FAILURE: i32 = 1;
    /// Nothing to act on, or the request does not fit the current state.
    pub const INVALID_REQUEST: i32 = 2;
    pub const ROLLED_BACK: i32 = 3;
}
