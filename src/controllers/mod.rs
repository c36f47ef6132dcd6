pub mod camera_controller;
