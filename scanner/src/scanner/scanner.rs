use crate::scanner::resources::Resources;
use crate::utils::config::{CONFIG_PATH, Config};
use crate::utils::logging::*;
use crate::utils::tls;
use crate::web::api::{detect, log};
use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use rustls::ServerConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::sleep;

pub struct Scanner;

impl Scanner {
    pub async fn run() {
        logging_information!(SystemEntry::Initializing);
        let config = Config::load(CONFIG_PATH);
        Logger::set_capacity(config.max_log_entries).await;
        let resources = web::Data::new(Resources::load(&config).await);
        let tls_config = Self::load_tls(&config).await;
        logging_information!(SystemEntry::InitializeComplete);
        let address = SocketAddr::from(([0, 0, 0, 0], config.http_server_bind_port));
        let max_payload_size = config.max_payload_size;
        let http_server = loop {
            let resources = resources.clone();
            let http_server = HttpServer::new(move || {
                let cors = Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600);
                App::new()
                    .wrap(cors)
                    .app_data(resources.clone())
                    .service(detect::initialize(max_payload_size))
                    .service(log::initialize())
            });
            let (http_server, scheme) = match &tls_config {
                Some(tls_config) => (http_server.bind_rustls_0_23(address, tls_config.clone()), "HTTPS"),
                None => (http_server.bind(address), "HTTP"),
            };
            match http_server {
                Ok(http_server) => {
                    logging_information!(NetworkEntry::Listening(address, scheme));
                    break http_server;
                }
                Err(err) => {
                    logging_critical!(NetworkEntry::BindPortError(err));
                    sleep(Duration::from_secs(config.bind_retry_duration)).await;
                    continue;
                }
            }
        };
        logging_information!(SystemEntry::WebReady);
        logging_information!(SystemEntry::Online);
        if let Err(err) = http_server.run().await {
            logging_emergency!(SystemEntry::WebPanic(err));
        }
    }

    pub async fn terminate() {
        logging_information!(SystemEntry::Terminating);
        logging_information!(SystemEntry::TerminateComplete);
    }

    async fn load_tls(config: &Config) -> Option<ServerConfig> {
        let (Some(certificate_path), Some(private_key_path)) = (&config.tls_certificate_path, &config.tls_private_key_path) else {
            logging_warning!(NetworkEntry::TlsDisabled);
            return None;
        };
        match tls::load_server_config(certificate_path, private_key_path) {
            Ok(tls_config) => Some(tls_config),
            Err(err) => {
                logging_error!(NetworkEntry::TlsConfigError(err.to_string()));
                logging_warning!(NetworkEntry::TlsDisabled);
                None
            }
        }
    }
}
