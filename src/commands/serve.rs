use dnsmasq_admin::http_server::HttpServer;
use dnsmasq_admin::settings::parse_listen;
use dnsmasq_admin::ControlService;
use std::sync::Arc;

pub(crate) async fn cmd_serve(
    service: Arc<ControlService>,
    listen: Option<&str>,
) -> anyhow::Result<bool> {
    let mut server = HttpServer::new(service);
    if let Some(listen) = listen {
        server = server.with_addr(parse_listen(listen)?);
    }
    server.run().await?;
    Ok(true)
}
