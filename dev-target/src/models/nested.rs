use super::address::Address;

pub struct Nested {
    /// @check: gt 0;lt 100
    pub id: i64,
    /// @check: notEmpty
    pub name: String,
    /// @check: required
    pub address: Address,
    /// @check: required
    pub addr: Option<Address>,
}
