pub mod password;
pub mod profile;

pub use password::change_password;
pub use profile::profile;
