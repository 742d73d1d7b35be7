/// A flat record with one rule of each class.
pub struct Basic {
    /// @check: gt 0;lt 100
    pub id: i64,
    /// @check: notEmpty
    pub name: String,
    /// @check: gt 0.0
    pub score: f32,
    /// @check: email
    pub email: String,
}

impl Basic {
    /// @ext:check
    pub fn score_in_range(&self) -> anyhow::Result<()> {
        if self.score > 100.0 {
            anyhow::bail!("score must stay under 100");
        }
        Ok(())
    }
}
