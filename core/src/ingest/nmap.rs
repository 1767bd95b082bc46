//! Port-scan XML parser (component C).

use super::parse_result::{HostRecord, ParseResult, ServiceRecord, SvcObservationRecord};
use crate::error::SonobatError;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;

/// Parse nmap-style port-scan XML into a [`ParseResult`].
///
/// Hosts without an IPv4 address are ignored. A `tunnel="ssl"` service
/// attribute, or the service name `https`, normalizes the application
/// protocol to `https`.
pub fn parse(xml: &str) -> Result<ParseResult, SonobatError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut result = ParseResult::default();
    let mut buf = Vec::new();

    let mut current_host: Option<String> = None;
    let mut current_port: Option<(String, i64)> = None;
    let mut pending_state: HashMap<(String, String, i64), String> = HashMap::new();
    let mut host_first_service: HashMap<String, (String, i64)> = HashMap::new();
    let mut in_ports = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| {
            SonobatError::ParseFormat(format!("malformed port-scan XML: {e}"))
        })? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                let tag = std::str::from_utf8(name.as_ref()).unwrap_or_default();
                match tag {
                    "host" => current_host = None,
                    "address" => {
                        if current_host.is_none() {
                            let attrs = attr_map(&e);
                            if attrs.get("addrtype").map(|s| s.as_str()) == Some("ipv4") {
                                if let Some(addr) = attrs.get("addr") {
                                    current_host = Some(addr.clone());
                                    result.hosts.push(HostRecord {
                                        authority: addr.clone(),
                                    });
                                }
                            }
                        }
                    }
                    "ports" => in_ports = true,
                    "port" => {
                        if in_ports {
                            if let Some(host) = &current_host {
                                let attrs = attr_map(&e);
                                let transport = attrs.get("protocol").cloned().unwrap_or_else(|| "tcp".to_string());
                                let port: i64 = attrs.get("portid").and_then(|s| s.parse().ok()).unwrap_or(0);
                                host_first_service
                                    .entry(host.clone())
                                    .or_insert_with(|| (transport.clone(), port));
                                current_port = Some((transport, port));
                            }
                        }
                    }
                    "state" => {
                        if let (Some(host), Some((transport, port))) = (&current_host, &current_port) {
                            let attrs = attr_map(&e);
                            let state = attrs.get("state").cloned().unwrap_or_else(|| "unknown".to_string());
                            pending_state.insert((host.clone(), transport.clone(), *port), state);
                        }
                    }
                    "service" => {
                        if let (Some(host), Some((transport, port))) = (&current_host, &current_port) {
                            let attrs = attr_map(&e);
                            let name = attrs.get("name").cloned().unwrap_or_default();
                            let tunnel = attrs.get("tunnel").map(|s| s.as_str()) == Some("ssl");
                            let app_proto = if tunnel || name == "https" { "https".to_string() } else { name };
                            let product = attrs.get("product").cloned().unwrap_or_default();
                            let version = attrs.get("version").cloned().unwrap_or_default();
                            let extrainfo = attrs.get("extrainfo").cloned().unwrap_or_default();
                            let banner = [product, version, extrainfo]
                                .into_iter()
                                .filter(|s| !s.is_empty())
                                .collect::<Vec<_>>()
                                .join(" ");
                            let conf: i64 = attrs.get("conf").and_then(|s| s.parse().ok()).unwrap_or(0);
                            let confidence = confidence_from_conf(conf);
                            let state = pending_state
                                .remove(&(host.clone(), transport.clone(), *port))
                                .unwrap_or_else(|| "unknown".to_string());

                            result.services.push(ServiceRecord {
                                host_authority: host.clone(),
                                transport: transport.clone(),
                                port: *port,
                                app_proto,
                                state,
                                banner,
                                confidence,
                            });
                        }
                    }
                    "osmatch" => {
                        if let Some(host) = &current_host {
                            let attrs = attr_map(&e);
                            let name = attrs.get("name").cloned().unwrap_or_default();
                            let accuracy: i64 = attrs.get("accuracy").and_then(|s| s.parse().ok()).unwrap_or(0);
                            let confidence = os_confidence(accuracy);
                            let (transport, port) = host_first_service
                                .get(host)
                                .cloned()
                                .unwrap_or_else(|| ("tcp".to_string(), 0));
                            result.svc_observations.push(SvcObservationRecord {
                                host_authority: host.clone(),
                                transport,
                                port,
                                raw_value: name,
                                source: "nmap".to_string(),
                                confidence,
                            });
                        }
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == b"ports" {
                    in_ports = false;
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(result)
}

fn confidence_from_conf(conf: i64) -> String {
    if conf == 10 {
        "high".to_string()
    } else if (7..=9).contains(&conf) {
        "medium".to_string()
    } else {
        "low".to_string()
    }
}

fn os_confidence(accuracy: i64) -> String {
    if accuracy >= 90 {
        "high".to_string()
    } else if accuracy >= 50 {
        "medium".to_string()
    } else {
        "low".to_string()
    }
}

fn attr_map(e: &quick_xml::events::BytesStart) -> HashMap<String, String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .map(|a| {
            let key = std::str::from_utf8(a.key.as_ref()).unwrap_or_default().to_string();
            let value = a.unescape_value().map(|v| v.to_string()).unwrap_or_default();
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <nmaprun>
          <host>
            <address addr="10.0.0.1" addrtype="ipv4"/>
            <ports>
              <port protocol="tcp" portid="443">
                <state state="open"/>
                <service name="https" product="nginx" version="1.18.0" conf="10"/>
              </port>
            </ports>
            <os>
              <osmatch name="Linux 5.X" accuracy="95"/>
            </os>
          </host>
          <host>
            <address addr="example.com" addrtype="hostname"/>
          </host>
        </nmaprun>
    "#;

    #[test]
    fn host_without_ipv4_is_ignored() {
        let result = parse(SAMPLE).unwrap();
        assert_eq!(result.hosts.len(), 1);
        assert_eq!(result.hosts[0].authority, "10.0.0.1");
    }

    #[test]
    fn service_picks_up_state_and_banner() {
        let result = parse(SAMPLE).unwrap();
        assert_eq!(result.services.len(), 1);
        let svc = &result.services[0];
        assert_eq!(svc.port, 443);
        assert_eq!(svc.app_proto, "https");
        assert_eq!(svc.state, "open");
        assert_eq!(svc.banner, "nginx 1.18.0");
        assert_eq!(svc.confidence, "high");
    }

    #[test]
    fn osmatch_becomes_high_confidence_svc_observation() {
        let result = parse(SAMPLE).unwrap();
        assert_eq!(result.svc_observations.len(), 1);
        let obs = &result.svc_observations[0];
        assert_eq!(obs.raw_value, "Linux 5.X");
        assert_eq!(obs.confidence, "high");
        assert_eq!(obs.port, 443);
    }

    #[test]
    fn tunnel_ssl_attribute_normalizes_to_https() {
        let xml = r#"
            <nmaprun>
              <host>
                <address addr="10.0.0.2" addrtype="ipv4"/>
                <ports>
                  <port protocol="tcp" portid="8443">
                    <state state="open"/>
                    <service name="http-proxy" tunnel="ssl" conf="8"/>
                  </port>
                </ports>
              </host>
            </nmaprun>
        "#;
        let result = parse(xml).unwrap();
        assert_eq!(result.services[0].app_proto, "https");
        assert_eq!(result.services[0].confidence, "medium");
    }
}
