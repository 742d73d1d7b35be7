/// @path: generated/validators
pub struct Relocated {
    /// @check: uuid4
    pub id: String,
    /// @check: min 2;max 64
    pub label: String,
}
