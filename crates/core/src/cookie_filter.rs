//! Bounded, prioritized cookie selection for the `Cookie` request header.
//!
//! Sending the whole browser jar trips upstream header-size limits, so only
//! priority-named cookies plus a capped number of cookies from relevant
//! domains are kept. Priority cookies are never dropped.

use chatgpt_protocol::Cookie;

use crate::config::CookiePolicy;

/// Selects the cookies to send, preserving input order within each group.
pub fn filter_for_transport(cookies: &[Cookie], policy: &CookiePolicy) -> Vec<Cookie> {
	let mut selected: Vec<Cookie> = cookies.iter().filter(|c| policy.is_priority(&c.name)).cloned().collect();

	if selected.len() < policy.domain_fill_threshold {
		let slots = policy.max_cookies.saturating_sub(selected.len());
		selected.extend(
			cookies
				.iter()
				.filter(|c| !policy.is_priority(&c.name) && policy.is_relevant_domain(&c.domain))
				.take(slots)
				.cloned(),
		);
	}

	selected
}

/// Renders cookies as a `Cookie` header value.
pub fn cookie_header(cookies: &[Cookie]) -> String {
	cookies.iter().map(Cookie::header_pair).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
	use super::*;

	fn c(name: &str, domain: &str) -> Cookie {
		Cookie::new(name, format!("{name}-value"), domain)
	}

	fn names(cookies: &[Cookie]) -> Vec<&str> {
		cookies.iter().map(|c| c.name.as_str()).collect()
	}

	#[test]
	fn empty_input_gives_empty_output() {
		assert!(filter_for_transport(&[], &CookiePolicy::default()).is_empty());
		assert_eq!(cookie_header(&[]), "");
	}

	#[test]
	fn priority_first_then_domain_overflow_in_order() {
		let input = vec![
			c("tracker", ".chatgpt.com"),
			c("_puid", ".chatgpt.com"),
			c("ads", ".doubleclick.net"),
			c("pref", "auth.openai.com"),
			c("cf_clearance", ".chatgpt.com"),
		];
		let out = filter_for_transport(&input, &CookiePolicy::default());
		assert_eq!(names(&out), vec!["_puid", "cf_clearance", "tracker", "pref"]);
	}

	#[test]
	fn priority_cookies_keep_input_order_not_list_order() {
		let input = vec![
			c("cf_clearance", ".chatgpt.com"),
			c("_puid", ".chatgpt.com"),
			c("__Secure-next-auth.session-token", "chatgpt.com"),
		];
		let out = filter_for_transport(&input, &CookiePolicy::default());
		assert_eq!(names(&out), vec!["cf_clearance", "_puid", "__Secure-next-auth.session-token"]);
	}

	#[test]
	fn overflow_keeps_input_order_after_out_of_order_priority() {
		let input = vec![
			c("zeta", ".chatgpt.com"),
			c("oai-did", ".chatgpt.com"),
			c("alpha", "auth.openai.com"),
			c("__cf_bm", ".chatgpt.com"),
		];
		let out = filter_for_transport(&input, &CookiePolicy::default());
		assert_eq!(names(&out), vec!["oai-did", "__cf_bm", "zeta", "alpha"]);
	}

	#[test]
	fn cookie_matching_both_criteria_appears_once() {
		let input = vec![c("__cf_bm", ".chatgpt.com"), c("other", ".chatgpt.com")];
		let out = filter_for_transport(&input, &CookiePolicy::default());
		assert_eq!(names(&out), vec!["__cf_bm", "other"]);
	}

	#[test]
	fn priority_names_are_kept_from_any_domain() {
		let out = filter_for_transport(&[c("_puid", "example.org")], &CookiePolicy::default());
		assert_eq!(names(&out), vec!["_puid"]);
	}

	#[test]
	fn domain_overflow_capped_at_thirty_total() {
		let mut input = vec![c("_puid", ".chatgpt.com"), c("cf_clearance", ".chatgpt.com")];
		input.extend((0..50).map(|i| c(&format!("extra{i}"), ".chatgpt.com")));
		let out = filter_for_transport(&input, &CookiePolicy::default());
		assert_eq!(out.len(), 30);
		assert_eq!(names(&out)[..3], ["_puid", "cf_clearance", "extra0"]);
		assert_eq!(out[29].name, "extra27");
	}

	#[test]
	fn large_priority_set_suppresses_domain_fill() {
		let policy = CookiePolicy::default();
		// Duplicate priority names (same name, different domains) so the
		// critical set reaches the threshold.
		let mut input: Vec<Cookie> = Vec::new();
		for i in 0..21 {
			input.push(c(&policy.priority_names[i % policy.priority_names.len()], &format!("d{i}.chatgpt.com")));
		}
		input.insert(3, c("filler", ".chatgpt.com"));
		let out = filter_for_transport(&input, &policy);
		assert_eq!(out.len(), 21);
		assert!(out.iter().all(|c| policy.is_priority(&c.name)));
	}

	#[test]
	fn priority_set_beyond_cap_is_never_truncated() {
		let policy = CookiePolicy::default();
		let input: Vec<Cookie> = (0..40).map(|i| c("oai-did", &format!("d{i}.chatgpt.com"))).collect();
		assert_eq!(filter_for_transport(&input, &policy).len(), 40);
	}

	#[test]
	fn header_joins_pairs() {
		let header = cookie_header(&[Cookie::new("a", "1", "x"), Cookie::new("b", "2", "x")]);
		assert_eq!(header, "a=1; b=2");
	}
}
