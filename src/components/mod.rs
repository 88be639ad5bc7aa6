pub mod gnss;
