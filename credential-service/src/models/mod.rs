mod account;
mod credential;

pub use account::{Dependent, Guardian};
pub use credential::AccessCredential;
