/// URL-safe slug for a displayable value: lowercased alphanumerics with
/// single `-` separators.
pub fn parameterize(value: &str) -> String {
	let mut out = String::with_capacity(value.len());
	let mut pending_separator = false;

	for ch in value.chars() {
		if ch.is_alphanumeric() {
			if pending_separator && !out.is_empty() {
				out.push('-');
			}
			for lower in ch.to_lowercase() {
				out.push(lower);
			}
			pending_separator = false;
		} else {
			pending_separator = true;
		}
	}

	out
}
