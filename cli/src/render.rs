//! Output formatting for user records.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;
use userstore_core::User;

/// CLI output format with clap argument parsing support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Writes users as an aligned text table.
pub fn write_table<W: Write>(out: &mut W, users: &[User]) -> io::Result<()> {
    writeln!(out, "  ID  |  Username    |  Email                     |  Created at")?;
    for user in users {
        writeln!(
            out,
            "  {:<3} |  {:<10}  |  {:<24}  |  {}",
            user.id,
            user.username,
            user.email,
            format_timestamp(&user.created_at)
        )?;
    }
    Ok(())
}

/// Writes pretty-printed JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

/// Writes users in the requested format.
pub fn write_users<W: Write>(out: &mut W, users: &[User], format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Table => write_table(out, users),
        OutputFormat::Json => write_json(out, users),
    }
}

/// Writes a single user in the requested format.
pub fn write_user<W: Write>(out: &mut W, user: &User, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Table => {
            writeln!(out, "ID:         {}", user.id)?;
            writeln!(out, "Username:   {}", user.username)?;
            writeln!(out, "Email:      {}", user.email)?;
            writeln!(out, "Created at: {}", format_timestamp(&user.created_at))
        }
        OutputFormat::Json => write_json(out, user),
    }
}
