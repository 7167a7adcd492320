#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    course_scheduler_web::run().await
}
