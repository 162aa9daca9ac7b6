//! Auth: OTP login and the pattern lock screen.
//!
//! Neither mechanism is a security boundary. The codes and patterns only
//! gate a shared shop terminal.

mod lock;
#[cfg(feature = "native")]
mod otp;

pub use lock::{LockScreen, LockStatus};
#[cfg(feature = "native")]
pub use otp::{LogMailer, LoginFlow, LoginStep, Mailer, OtpCode, Role, Signatory};
