use crate::role::Role;
use crate::search::PageGroup;

pub const NO_RESULTS: &str = "No relevant information found.";

/// Locator for a document on the local filesystem.
///
/// `absolute_path` should already be absolute; it is not resolved here.
pub fn file_locator(absolute_path: &str) -> String {
    if absolute_path.starts_with('/') {
        format!("file://{absolute_path}")
    } else {
        // Windows-style drive paths need the extra slash.
        format!("file:///{}", absolute_path.replace('\\', "/"))
    }
}

/// Deep link to a page of the document.
pub fn deep_link(locator: &str, page_number: usize) -> String {
    format!("{locator}#page={page_number}")
}

/// One-line summary for a page group: `Page N [Contains: a, b] (Score: x.xx)`.
pub fn page_heading(group: &PageGroup) -> String {
    let roles = group
        .roles_present
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let contains = if roles.is_empty() {
        String::new()
    } else {
        format!(" [Contains: {roles}]")
    };
    format!(
        "Page {}{} (Score: {:.2})",
        group.page_number, contains, group.best_score
    )
}

/// Total number of hits across the groups.
pub fn hit_count(groups: &[PageGroup]) -> usize {
    groups.iter().map(|g| g.hits.len()).sum()
}

/// Render the full printable report.
pub fn render(groups: &[PageGroup], locator: &str) -> String {
    if groups.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut out = format!("Found {} relevant results:\n", hit_count(groups));
    for group in groups {
        out.push('\n');
        out.push_str(&page_heading(group));
        out.push('\n');
        out.push_str(&format!(
            "Link: {}\n",
            deep_link(locator, group.page_number)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::search::Hit;

    fn group(page: usize, score: f64, roles: &[Role]) -> PageGroup {
        let roles: BTreeSet<Role> = roles.iter().copied().collect();
        PageGroup {
            page_number: page,
            roles_present: roles.clone(),
            best_score: score,
            hits: vec![Hit::new(page, score, roles)],
        }
    }

    #[test]
    fn test_file_locator() {
        assert_eq!(file_locator("/tmp/doc.pdf"), "file:///tmp/doc.pdf");
        assert_eq!(file_locator("C:\\docs\\a.pdf"), "file:///C:/docs/a.pdf");
    }

    #[test]
    fn test_deep_link() {
        assert_eq!(
            deep_link("file:///tmp/doc.pdf", 12),
            "file:///tmp/doc.pdf#page=12"
        );
    }

    #[test]
    fn test_page_heading_formats_two_decimals() {
        let g = group(3, 1.23456, &[Role::Heading1, Role::Body]);
        assert_eq!(
            page_heading(&g),
            "Page 3 [Contains: heading1, body] (Score: 1.23)"
        );
    }

    #[test]
    fn test_page_heading_without_roles() {
        let g = group(1, 0.0, &[]);
        assert_eq!(page_heading(&g), "Page 1 (Score: 0.00)");
    }

    #[test]
    fn test_render_report() {
        let groups = vec![group(2, 4.5, &[Role::Body]), group(1, 1.0, &[Role::Bold])];
        let report = render(&groups, "file:///doc.pdf");
        assert_eq!(
            report,
            "Found 2 relevant results:\n\
             \nPage 2 [Contains: body] (Score: 4.50)\nLink: file:///doc.pdf#page=2\n\
             \nPage 1 [Contains: bold] (Score: 1.00)\nLink: file:///doc.pdf#page=1\n"
        );
    }

    #[test]
    fn test_render_no_results() {
        assert_eq!(render(&[], "file:///doc.pdf"), NO_RESULTS);
    }
}
