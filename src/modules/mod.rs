pub mod capture;
pub mod creds;
pub mod rtsp;
