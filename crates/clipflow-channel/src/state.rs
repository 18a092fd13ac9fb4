use clipflow_db::VideoRepository;

pub struct AppState {
    pub videos: VideoRepository,
}
