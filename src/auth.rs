use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

pub const PASSWORD_ENV: &str = "MASTERVAULT_PASSWORD";
pub const NEW_PASSWORD_ENV: &str = "MASTERVAULT_NEW_PASSWORD";

/// Reads the current passphrase.
///
/// Sources in order: `MASTERVAULT_PASSWORD`, one line of piped stdin,
/// an interactive prompt. `hint` is shown on the prompt when non-empty.
pub fn read_password(hint: Option<&str>) -> Result<Zeroizing<String>> {
    //  MASTERVAULT_PASSWORD="supersecret" mastervault unlock
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    //  printf "%s\n" "$PW" | mastervault unlock
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if !buf.is_empty() {
            return Ok(buf);
        }
        bail!("No password provided");
    }

    if let Some(hint) = hint.filter(|h| !h.is_empty()) {
        eprintln!("Hint: {hint}");
    }
    let pw = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if pw.is_empty() {
        bail!("No password provided");
    }
    Ok(pw)
}

/// Reads a new passphrase twice and checks that both entries match.
///
/// `MASTERVAULT_NEW_PASSWORD` skips the confirmation.
pub fn read_new_password_with_confirmation() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(NEW_PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let (pw1, pw2) = if !io::stdin().is_terminal() {
        let stdin = io::stdin();
        let mut handle = stdin.lock();

        let mut pw1 = Zeroizing::new(String::new());
        let mut pw2 = Zeroizing::new(String::new());

        handle.read_line(&mut pw1)?;
        handle.read_line(&mut pw2)?;

        trim_newline(&mut pw1);
        trim_newline(&mut pw2);
        (pw1, pw2)
    } else {
        (
            Zeroizing::new(rpassword::prompt_password("New password: ")?),
            Zeroizing::new(rpassword::prompt_password("Confirm password: ")?),
        )
    };

    if pw1.is_empty() {
        bail!("password cannot be empty");
    }

    if pw1 != pw2 {
        bail!("passwords do not match");
    }

    Ok(pw1)
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
