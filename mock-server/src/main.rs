use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "9090".to_string());
    let secret = std::env::var("SECRET").unwrap_or_else(|_| "insecureSecret".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("mock openfire rest api listening on {addr}");
    mock_server::run(listener, secret).await
}
