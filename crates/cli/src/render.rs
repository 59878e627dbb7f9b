//! Human-readable rendering of table state and the detail view.

use usertable_api::TableState;
use usertable_core::columns::{display_cell, table_columns};
use usertable_core::UserRecord;
use usertable_query::PageLink;

fn fit(text: &str, width: usize) -> String {
    let n = text.chars().count();
    if n <= width {
        return format!("{:<width$}", text, width = width);
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn table(state: &TableState) -> String {
    let cols = table_columns();
    let mut out = String::new();
    if state.loading {
        out.push_str("Loading…\n");
    }
    if let Some(msg) = state.error_message {
        out.push_str(msg);
        out.push_str(" (type `retry`)\n");
    }

    let header: Vec<String> = cols.iter().map(|c| fit(&c.header(&state.sort), c.width)).collect();
    out.push_str(header.join(" ").trim_end());
    out.push('\n');
    for rec in &state.view.page_items {
        let row: Vec<String> = cols.iter().map(|c| fit(&display_cell(rec, c.key), c.width)).collect();
        out.push_str(&format!("{:>4} {}\n", rec.id, row.join(" ").trim_end()));
    }

    if state.view.is_empty() {
        if !state.loading {
            out.push_str(if state.filter.is_empty() { "No users found\n" } else { "No users match the current filters\n" });
        }
    } else if let Some((start, end)) = state.view.item_range() {
        out.push_str(&format!("Showing {}–{} of {}\n", start, end, state.view.total_filtered));
    }
    if !state.page_links.is_empty() {
        out.push_str(&links(&state.page_links, state.view.valid_page));
        out.push('\n');
    }
    out
}

pub fn links(links: &[PageLink], current: usize) -> String {
    links
        .iter()
        .map(|l| match l {
            PageLink::Page(p) if *p == current => format!("[{}]", p),
            PageLink::Page(p) => p.to_string(),
            PageLink::Ellipsis => "…".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn detail(rec: &UserRecord) -> String {
    let mut lines = vec![format!("#{} {}", rec.id, rec.full_name())];
    if !rec.maiden_name().is_empty() {
        lines.push(format!("  maiden name: {}", rec.maiden_name()));
    }
    lines.push(format!("  age:         {}", rec.age));
    lines.push(format!("  gender:      {}", rec.gender.label()));
    lines.push(format!("  email:       {}", rec.email));
    lines.push(format!("  phone:       {}", rec.phone));
    if let Some(b) = rec.birth_date.as_deref() {
        lines.push(format!("  birth date:  {}", b));
    }
    if let Some(h) = rec.height {
        lines.push(format!("  height:      {:.1}", h));
    }
    if let Some(w) = rec.weight {
        lines.push(format!("  weight:      {:.1}", w));
    }
    let addr = rec.full_address();
    lines.push(format!("  address:     {}", if addr.is_empty() { "-" } else { addr.as_str() }));
    if !rec.address.postal_code.is_empty() {
        lines.push(format!("  postal code: {}", rec.address.postal_code));
    }
    if !rec.company.name.is_empty() {
        lines.push(format!("  company:     {}", rec.company.name));
    }
    if let Some(img) = rec.image.as_deref().filter(|u| !u.is_empty()) {
        lines.push(format!("  image:       {}", img));
    }
    lines.join("\n")
}
