pub mod keyboard_view;
pub mod layout;
