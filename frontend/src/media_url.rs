//! 图片地址解析
//!
//! 后端返回的 `foto_url` 是相对路径。生产环境中与页面同源；本地开发时
//! 页面由开发服务器提供，图片需要指向另一个端口上的后端。

use url::Url;

/// 把后端返回的图片路径解析为可直接使用的地址
///
/// - 已是绝对地址（http/https/data/blob）时原样返回
/// - 页面端口属于开发端口时，指向同一主机的 `media_port`
/// - 否则相对于页面地址解析
pub fn resolve_media_url(raw: &str, page: &Url, dev_ports: &[u16], media_port: u16) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(absolute) = Url::parse(raw) {
        return absolute.to_string();
    }

    let mut base = page.clone();
    let is_dev = page.port().is_some_and(|port| dev_ports.contains(&port));
    if is_dev && base.set_port(Some(media_port)).is_err() {
        log::warn!("[Media] cannot rewrite port for {}", page);
    }

    let path = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    };
    match base.join(&path) {
        Ok(url) => url.to_string(),
        Err(e) => {
            log::warn!("[Media] invalid photo path {:?}: {}", raw, e);
            path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV: [u16; 3] = [3000, 5173, 8080];

    fn page(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn dev_server_points_to_media_port() {
        assert_eq!(
            resolve_media_url(
                "/storage/fotos/1.jpg",
                &page("http://localhost:5173/bobinas"),
                &DEV,
                8000
            ),
            "http://localhost:8000/storage/fotos/1.jpg"
        );
        assert_eq!(
            resolve_media_url("storage/x.jpg", &page("http://192.168.1.20:3000/"), &DEV, 8000),
            "http://192.168.1.20:8000/storage/x.jpg"
        );
    }

    #[test]
    fn production_resolves_against_page_origin() {
        assert_eq!(
            resolve_media_url(
                "/storage/fotos/1.jpg",
                &page("https://bobinas.example.com/bobinas?page=2"),
                &DEV,
                8000
            ),
            "https://bobinas.example.com/storage/fotos/1.jpg"
        );
    }

    #[test]
    fn absolute_and_empty_urls() {
        let dev = page("http://localhost:3000/");
        assert_eq!(
            resolve_media_url("https://cdn.example.com/a.jpg", &dev, &DEV, 8000),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(resolve_media_url("  ", &dev, &DEV, 8000), "");
    }
}
