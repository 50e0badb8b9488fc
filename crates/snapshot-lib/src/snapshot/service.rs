//! Service address and port rendering

use k8s_openapi::api::core::v1::Service;

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// External addresses of a service, sorted.
///
/// `ClusterIP` and `NodePort` services expose their declared external IPs;
/// `LoadBalancer` services add each ingress IP, or its hostname when no IP
/// is set. Other types have no external addresses.
pub fn external_ips(service: &Service) -> Vec<String> {
    let spec = service.spec.as_ref();
    let declared = || {
        spec.and_then(|s| s.external_ips.as_ref())
            .into_iter()
            .flatten()
            .filter(|ip| !ip.is_empty())
            .cloned()
    };

    let mut ips: Vec<String> = match spec.and_then(|s| s.type_.as_deref()) {
        Some("ClusterIP") | Some("NodePort") => declared().collect(),
        Some("LoadBalancer") => {
            let ingress = service
                .status
                .as_ref()
                .and_then(|s| s.load_balancer.as_ref())
                .and_then(|lb| lb.ingress.as_ref())
                .into_iter()
                .flatten()
                .filter_map(|i| non_empty(&i.ip).or_else(|| non_empty(&i.hostname)))
                .map(str::to_string);
            declared().chain(ingress).collect()
        }
        _ => Vec::new(),
    };

    ips.sort();
    ips
}

/// Service ports as `port/protocol`, sorted; protocol defaults to `TCP`
pub fn service_ports(service: &Service) -> Vec<String> {
    let mut ports: Vec<String> = service
        .spec
        .as_ref()
        .and_then(|s| s.ports.as_ref())
        .into_iter()
        .flatten()
        .map(|p| format!("{}/{}", p.port, p.protocol.as_deref().unwrap_or("TCP")))
        .collect();

    ports.sort();
    ports
}
