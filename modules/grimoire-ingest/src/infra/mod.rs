pub mod downloader;

pub use downloader::HttpDownloader;
