//! Hand-off point to a database driver.
//!
//! The engine never executes anything. A driver integration implements
//! [`CommandFactory`] to turn a rendered [`SqlStatement`] into its own command
//! type, binding parameters by name, declared type, value and size.

use crate::error::SqlError;
use crate::select::SelectBuilder;
use crate::statement::SqlStatement;

pub trait CommandFactory {
    type Command;
    type Error: From<SqlError>;

    fn create_command(&self, statement: &SqlStatement) -> Result<Self::Command, Self::Error>;
}

/// Render `builder` and pass the statement to `factory`.
pub fn execute_with<F: CommandFactory>(
    builder: &SelectBuilder,
    factory: &F,
) -> Result<F::Command, F::Error> {
    let statement = builder.render()?;
    factory.create_command(&statement)
}
