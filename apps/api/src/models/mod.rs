pub mod certification;
pub mod cover_letter;
pub mod education;
pub mod experience;
pub mod user;
