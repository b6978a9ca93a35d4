use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;

use crate::config::ConnectionConfig;
use crate::domain::OrganismName;
use crate::error::{ApolloError, TransportError, TransportErrorKind};

/// Coordinates of one feature for the sequence-by-name export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRequest<'a> {
    pub organism: &'a OrganismName,
    pub sequence_name: &'a str,
    pub feature_name: &'a str,
}

pub trait ApolloClient: Send + Sync {
    /// Full GFF3 export of an organism.
    fn write_annotation(&self, organism: &OrganismName) -> Result<String, TransportError>;
    /// Peptide sequence of a single feature.
    fn sequence_by_name(&self, request: &SequenceRequest<'_>) -> Result<String, TransportError>;
}

#[derive(Debug, Serialize)]
struct ExportBody<'a> {
    username: &'a str,
    password: &'a str,
    organism: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    format: &'static str,
    output: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SequenceBody<'a> {
    username: &'a str,
    password: &'a str,
    organism_string: &'a str,
    sequence_name: &'a str,
    feature_name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    output: &'static str,
}

#[derive(Clone)]
pub struct ApolloHttpClient {
    client: Client,
    config: ConnectionConfig,
}

impl ApolloHttpClient {
    pub fn new(config: ConnectionConfig) -> Result<Self, ApolloError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("apollo-pep/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ApolloError::HttpClient(err.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| ApolloError::HttpClient(err.to_string()))?;
        Ok(Self { client, config })
    }

    fn export_body<'a>(&'a self, organism: &'a OrganismName) -> ExportBody<'a> {
        ExportBody {
            username: &self.config.user,
            password: &self.config.password,
            organism: organism.as_str(),
            kind: "GFF3",
            format: "text",
            output: "text",
        }
    }

    fn sequence_body<'a>(&'a self, request: &SequenceRequest<'a>) -> SequenceBody<'a> {
        SequenceBody {
            username: &self.config.user,
            password: &self.config.password,
            organism_string: request.organism.as_str(),
            sequence_name: request.sequence_name,
            feature_name: request.feature_name,
            kind: "peptide",
            output: "text",
        }
    }

    fn send_text(url: &str, request: RequestBuilder) -> Result<String, TransportError> {
        let response = request
            .send()
            .map_err(|err| classify(url, &err))?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Apollo request failed".to_string());
            return Err(TransportError::new(
                TransportErrorKind::Protocol {
                    status: Some(status.as_u16()),
                },
                url,
                message,
            ));
        }
        response.text().map_err(|err| classify(url, &err))
    }
}

impl ApolloClient for ApolloHttpClient {
    fn write_annotation(&self, organism: &OrganismName) -> Result<String, TransportError> {
        let url = self.config.export_url();
        let request = self.client.post(&url).json(&self.export_body(organism));
        Self::send_text(&url, request)
    }

    fn sequence_by_name(&self, request: &SequenceRequest<'_>) -> Result<String, TransportError> {
        let url = self.config.sequence_url();
        let builder = self.client.post(&url).json(&self.sequence_body(request));
        Self::send_text(&url, builder)
    }
}

fn classify(url: &str, err: &reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connection
    } else {
        TransportErrorKind::Protocol {
            status: err.status().map(|status| status.as_u16()),
        }
    };
    TransportError::new(kind, url, err.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn client_for(base_url: &str, timeout: Duration) -> ApolloHttpClient {
        ApolloHttpClient::new(ConnectionConfig {
            base_url: base_url.to_string(),
            user: "api@local.host".to_string(),
            password: "secret".to_string(),
            timeout,
            export_path: "/IOService/write".to_string(),
            sequence_path: "/sequence/sequenceByName".to_string(),
        })
        .unwrap()
    }

    fn client() -> ApolloHttpClient {
        client_for("http://127.0.0.1:9", Duration::from_secs(2))
    }

    /// Consumes one HTTP request (headers plus a Content-Length body).
    fn read_request(stream: &TcpStream) -> String {
        let mut reader = BufReader::new(stream);
        let mut content_length = 0;
        let mut head = String::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.eq_ignore_ascii_case("content-length")
            {
                content_length = value.trim().parse().unwrap();
            }
            head.push_str(&line);
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).unwrap();
        head + &String::from_utf8(body).unwrap()
    }

    /// Serves a single connection with `respond`, returning the base url.
    fn serve_once<F>(respond: F) -> (String, JoinHandle<String>)
    where
        F: FnOnce(&mut TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&stream);
            respond(&mut stream);
            request
        });
        (base_url, handle)
    }

    fn organism() -> OrganismName {
        "speciesX".parse().unwrap()
    }

    #[test]
    fn export_body_shape() {
        let client = client();
        let organism: OrganismName = "speciesX".parse().unwrap();
        let body = serde_json::to_value(client.export_body(&organism)).unwrap();
        assert_eq!(
            body,
            json!({
                "username": "api@local.host",
                "password": "secret",
                "organism": "speciesX",
                "type": "GFF3",
                "format": "text",
                "output": "text",
            })
        );
    }

    #[test]
    fn sequence_body_shape() {
        let client = client();
        let organism: OrganismName = "speciesX".parse().unwrap();
        let request = SequenceRequest {
            organism: &organism,
            sequence_name: "CM027411.1",
            feature_name: "5448bf02-c6b6-4ec6-9800-519cb2b64640",
        };
        let body = serde_json::to_value(client.sequence_body(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "username": "api@local.host",
                "password": "secret",
                "organismString": "speciesX",
                "sequenceName": "CM027411.1",
                "featureName": "5448bf02-c6b6-4ec6-9800-519cb2b64640",
                "type": "peptide",
                "output": "text",
            })
        );
    }

    #[test]
    fn success_body_is_returned_verbatim() {
        let (base_url, server) = serve_once(|stream| {
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\n>p\nMPE\n\n")
                .unwrap();
        });
        let client = client_for(&base_url, Duration::from_secs(5));
        let text = client.write_annotation(&organism()).unwrap();
        assert_eq!(text, ">p\nMPE\n\n");

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /IOService/write HTTP/1.1"));
        assert!(request.contains("\"organism\":\"speciesX\""));
    }

    #[test]
    fn server_error_status_is_a_protocol_failure() {
        let (base_url, server) = serve_once(|stream| {
            stream
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 5\r\nConnection: close\r\n\r\nerror",
                )
                .unwrap();
        });
        let client = client_for(&base_url, Duration::from_secs(5));
        let err = client.write_annotation(&organism()).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Protocol { status: Some(500) });
        assert_eq!(err.message, "error");
        assert_eq!(err.url, format!("{base_url}/IOService/write"));
        server.join().unwrap();
    }

    #[test]
    fn refused_connection_is_a_connection_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = client_for(&base_url, Duration::from_secs(5));
        let organism = organism();
        let request = SequenceRequest {
            organism: &organism,
            sequence_name: "chr1",
            feature_name: "t1",
        };
        let err = client.sequence_by_name(&request).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Connection);
    }

    #[test]
    fn silent_server_is_a_timeout() {
        let (base_url, server) = serve_once(|_stream| {
            thread::sleep(Duration::from_secs(3));
        });
        let client = client_for(&base_url, Duration::from_secs(1));
        let err = client.write_annotation(&organism()).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Timeout);
        server.join().unwrap();
    }
}
