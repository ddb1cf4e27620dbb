pub mod media_worker;
