pub struct Address {
    /// @check: lt 10
    pub id: i64,
    pub province: String,
    pub city: String,
}
