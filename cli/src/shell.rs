//! Interactive menu loop over a [`UserStore`].
//!
//! The shell is generic over its input and output so it can be driven by a
//! terminal or by a byte buffer in tests. End of input behaves like the
//! exit option.

use std::io::{self, BufRead, Write};

use tracing::debug;
use userstore_core::{Context, StoreError, User, UserStore, ValidationError, validate_user};

use crate::config::CliConfig;
use crate::render::write_table;

const MENU: &str = "
--- User Management System ---
1. Create User
2. List All Users
3. Update User
4. Delete User
5. Exit";

/// Interactive session state.
pub struct Shell<'a, R, W> {
    store: &'a dyn UserStore,
    config: &'a CliConfig,
    root: Context,
    input: R,
    output: W,
}

enum Flow {
    Continue,
    Exit,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(store: &'a dyn UserStore, config: &'a CliConfig, input: R, output: W) -> Self {
        Self {
            store,
            config,
            root: Context::background(),
            input,
            output,
        }
    }

    /// Runs the menu loop until the user exits or input ends.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.output, "{MENU}")?;
            let Some(choice) = self.prompt("Select an option: ")? else {
                writeln!(self.output, "Exiting program...")?;
                return Ok(());
            };

            debug!(choice = %choice, "menu selection");
            let flow = match choice.as_str() {
                "1" => self.create_user()?,
                "2" => self.list_users()?,
                "3" => self.update_user()?,
                "4" => self.delete_user()?,
                "5" => {
                    writeln!(self.output, "Exiting program...")?;
                    return Ok(());
                }
                "" => Flow::Continue,
                other => {
                    writeln!(self.output, "Unknown option: {other}")?;
                    Flow::Continue
                }
            };

            if let Flow::Exit = flow {
                writeln!(self.output, "Exiting program...")?;
                return Ok(());
            }
        }
    }

    fn create_user(&mut self) -> io::Result<Flow> {
        let Some(username) = self.prompt("Enter Username: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(email) = self.prompt("Enter Email: ")? else {
            return Ok(Flow::Exit);
        };

        let mut user = User::new(username, email);
        if !self.report_invalid(&user)? {
            return Ok(Flow::Continue);
        }

        let ctx = self.config.operation_context(&self.root);
        match self.store.create(&ctx, &mut user) {
            Ok(()) => writeln!(self.output, "User Created! (id {})", user.id)?,
            Err(err) => writeln!(self.output, "Error: {}", describe(&err))?,
        }
        Ok(Flow::Continue)
    }

    fn list_users(&mut self) -> io::Result<Flow> {
        let ctx = self.config.operation_context(&self.root);
        match self.store.list_all(&ctx) {
            Ok(users) if users.is_empty() => writeln!(self.output, "No users found.")?,
            Ok(users) => {
                writeln!(self.output)?;
                write_table(&mut self.output, &users)?;
            }
            Err(err) => writeln!(self.output, "failed to list users: {}", describe(&err))?,
        }
        Ok(Flow::Continue)
    }

    fn update_user(&mut self) -> io::Result<Flow> {
        let Some(raw_id) = self.prompt("Enter user ID: ")? else {
            return Ok(Flow::Exit);
        };
        let Ok(id) = raw_id.parse::<i64>() else {
            writeln!(self.output, "invalid id")?;
            return Ok(Flow::Continue);
        };

        let Some(mut user) = self.load(id)? else {
            return Ok(Flow::Continue);
        };

        let Some(username) = self.prompt(&format!("Username [{}]: ", user.username))? else {
            return Ok(Flow::Exit);
        };
        if !username.is_empty() {
            user.username = username;
        }
        let Some(email) = self.prompt(&format!("Email [{}]: ", user.email))? else {
            return Ok(Flow::Exit);
        };
        if !email.is_empty() {
            user.email = email;
        }

        if !self.report_invalid(&user)? {
            return Ok(Flow::Continue);
        }

        let ctx = self.config.operation_context(&self.root);
        match self.store.update(&ctx, &user) {
            Ok(()) => writeln!(self.output, "Updated successfully!")?,
            Err(err) => writeln!(self.output, "Update failed: {}", describe(&err))?,
        }
        Ok(Flow::Continue)
    }

    fn delete_user(&mut self) -> io::Result<Flow> {
        let Some(raw_id) = self.prompt("Enter a user ID to delete: ")? else {
            return Ok(Flow::Exit);
        };
        let Ok(id) = raw_id.parse::<i64>() else {
            writeln!(self.output, "Invalid ID format")?;
            return Ok(Flow::Continue);
        };

        let Some(user) = self.load(id)? else {
            return Ok(Flow::Continue);
        };

        let Some(confirm) = self.prompt("Are you sure you want to delete? (y/n): ")? else {
            return Ok(Flow::Exit);
        };
        if confirm != "y" {
            writeln!(self.output, "Delete cancelled.")?;
            return Ok(Flow::Continue);
        }

        let ctx = self.config.operation_context(&self.root);
        match self.store.delete(&ctx, user.id) {
            Ok(()) => writeln!(self.output, "User deleted successfully")?,
            Err(err) => writeln!(self.output, "Delete failed: {}", describe(&err))?,
        }
        Ok(Flow::Continue)
    }

    /// Fetches a user, printing the failure when there is none.
    fn load(&mut self, id: i64) -> io::Result<Option<User>> {
        let ctx = self.config.operation_context(&self.root);
        match self.store.get_by_id(&ctx, id) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                writeln!(self.output, "{}", describe(&err))?;
                Ok(None)
            }
        }
    }

    /// Prints validation problems; returns `true` when the record is valid.
    fn report_invalid(&mut self, user: &User) -> io::Result<bool> {
        let errors = validate_user(user);
        if errors.is_empty() {
            return Ok(true);
        }
        let missing = errors
            .iter()
            .any(|e| matches!(e, ValidationError::EmptyUsername | ValidationError::EmptyEmail));
        if missing {
            writeln!(self.output, "username and email are required")?;
        } else {
            for err in &errors {
                writeln!(self.output, "{err}")?;
            }
        }
        Ok(false)
    }

    /// Prints `label` and reads one trimmed line; `None` at end of input.
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

/// Human-readable message for a store failure.
pub fn describe(err: &StoreError) -> String {
    match err {
        StoreError::NotFound(_) => "User not found".to_string(),
        StoreError::Duplicate { field: Some(field) } => {
            format!("User already exists ({field} is taken)")
        }
        StoreError::Duplicate { field: None } => "User already exists".to_string(),
        other => other.to_string(),
    }
}
