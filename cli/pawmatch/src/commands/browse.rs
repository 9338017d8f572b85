use std::fmt::Display;
use std::io::Write;

use anyhow::{Result, bail};
use bpaf::Bpaf;
use inquire::InquireError;
use inquire::error::InquireResult;
use pawmatch_catalog::Gateway;
use pawmatch_sdk::models::browse::{Applied, PageStatus};
use pawmatch_sdk::models::matching::MatchOutcome;
use pawmatch_sdk::models::notification::{NoticeKind, Notification};
use pawmatch_sdk::pawmatch::Pawmatch;
use tracing::{debug, instrument};

use super::auth::{CredentialArgs, credential_args, end_session, start_session};
use crate::config::Config;
use crate::utils::dialog::{Confirm, Dialog, MultiSelect, Select, Text};
use crate::utils::display::{DisplayCandidate, DisplayCandidates, DisplayMatch};
use crate::utils::message;

// Browse the catalog interactively
#[derive(Debug, Clone, Bpaf)]
pub struct Browse {
    #[bpaf(external(credential_args))]
    pub credentials: CredentialArgs,
}

/// How a browsing session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Quit,
    /// The service no longer accepts the session
    Expired,
}

/// What to do after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Expired,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    NextPage,
    PreviousPage,
    GoToPage,
    FilterBreed,
    ToggleSort,
    Favorites,
    ShowFavorites,
    Match,
    Refresh,
    Quit,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Action::NextPage => "Next page",
            Action::PreviousPage => "Previous page",
            Action::GoToPage => "Go to page...",
            Action::FilterBreed => "Filter by breed...",
            Action::ToggleSort => "Reverse sort order",
            Action::Favorites => "Pick favorites on this page...",
            Action::ShowFavorites => "Show favorites",
            Action::Match => "Find my match",
            Action::Refresh => "Reload page",
            Action::Quit => "Log out and quit",
        };
        write!(f, "{label}")
    }
}

const ACTIONS: [Action; 10] = [
    Action::NextPage,
    Action::PreviousPage,
    Action::GoToPage,
    Action::FilterBreed,
    Action::ToggleSort,
    Action::Favorites,
    Action::ShowFavorites,
    Action::Match,
    Action::Refresh,
    Action::Quit,
];

impl Browse {
    #[instrument(name = "browse", skip_all)]
    pub async fn handle<G: Gateway>(self, config: Config, mut pawmatch: Pawmatch<G>) -> Result<()> {
        if !Dialog::can_prompt() {
            bail!("Browsing requires an interactive terminal, use 'pawmatch search' instead");
        }

        let mut stdout = std::io::stdout();
        loop {
            start_session(&mut pawmatch, &self.credentials, &config).await?;
            match browse_session(&mut pawmatch, &mut stdout).await {
                Ok(SessionEnd::Expired) => {
                    message::notice(&Notification::session_expired());
                    if !confirm_login().await? {
                        return Ok(());
                    }
                    debug!("session expired, logging in again");
                },
                Ok(SessionEnd::Quit) => break,
                Err(e) => {
                    end_session(&mut pawmatch).await;
                    return Err(e);
                },
            }
        }

        end_session(&mut pawmatch).await;
        Ok(())
    }
}

async fn browse_session<G: Gateway>(
    pawmatch: &mut Pawmatch<G>,
    out: &mut impl Write,
) -> Result<SessionEnd> {
    if perform(pawmatch, Action::Refresh, out).await? == Step::Expired {
        return Ok(SessionEnd::Expired);
    }

    loop {
        let action = Dialog {
            message: "What next?",
            help_message: None,
            typed: Select {
                options: ACTIONS.to_vec(),
            },
        }
        .prompt()
        .await;

        let Some(action) = cancelled_as_none(action)? else {
            return Ok(SessionEnd::Quit);
        };

        match perform(pawmatch, action, out).await? {
            Step::Continue => continue,
            Step::Expired => return Ok(SessionEnd::Expired),
            Step::Quit => return Ok(SessionEnd::Quit),
        }
    }
}

/// Run a single action against the session.
async fn perform<G: Gateway>(
    pawmatch: &mut Pawmatch<G>,
    action: Action,
    out: &mut impl Write,
) -> Result<Step> {
    debug!(%action, "performing action");
    match action {
        Action::NextPage => {
            let result = pawmatch.next_page().await;
            paged(pawmatch, result, out)
        },
        Action::PreviousPage => {
            let result = pawmatch.previous_page().await;
            if matches!(result, Ok(None)) {
                message::info("Already on the first page");
                return Ok(Step::Continue);
            }
            paged(pawmatch, result, out)
        },
        Action::GoToPage => {
            let Some(page) = prompt_page().await? else {
                return Ok(Step::Continue);
            };
            go_to_page(pawmatch, page, out).await
        },
        Action::FilterBreed => {
            let breeds = match pawmatch.load_breeds().await {
                Ok(breeds) => breeds,
                Err(notice) => return Ok(handle_notice(notice)),
            };
            let mut options = vec![BreedChoice::All];
            options.extend(breeds.iter().map(|b| BreedChoice::Breed(b.to_string())));
            let choice = Dialog {
                message: "Show dogs of breed",
                help_message: Some("Type to narrow down the list"),
                typed: Select { options },
            }
            .prompt()
            .await;
            let Some(choice) = cancelled_as_none(choice)? else {
                return Ok(Step::Continue);
            };
            let breed = match choice {
                BreedChoice::All => None,
                BreedChoice::Breed(breed) => Some(breed),
            };
            let result = pawmatch.set_breed_filter(breed).await;
            page_loaded(pawmatch, result, out)
        },
        Action::ToggleSort => {
            let sort = pawmatch.criteria().sort.reversed();
            let result = pawmatch.set_sort_order(sort).await;
            page_loaded(pawmatch, result, out)
        },
        Action::Favorites => {
            pick_favorites(pawmatch).await?;
            Ok(Step::Continue)
        },
        Action::ShowFavorites => {
            show_favorites(pawmatch);
            Ok(Step::Continue)
        },
        Action::Match => match pawmatch.generate_match().await {
            Ok(MatchOutcome::Matched(result)) => {
                message::updated("You matched with:");
                writeln!(out, "{}", DisplayMatch(&result))?;
                Ok(Step::Continue)
            },
            Ok(MatchOutcome::NoMatch) => {
                message::plain("The service did not pick a match");
                Ok(Step::Continue)
            },
            Err(notice) => Ok(handle_notice(notice)),
        },
        Action::Refresh => {
            let result = pawmatch.refresh().await;
            page_loaded(pawmatch, result, out)
        },
        Action::Quit => Ok(Step::Quit),
    }
}

/// Go to the 1-based `page` typed by the user
async fn go_to_page<G: Gateway>(
    pawmatch: &mut Pawmatch<G>,
    page: i64,
    out: &mut impl Write,
) -> Result<Step> {
    let result = match page.checked_sub(1) {
        Some(page_index) => pawmatch.go_to_page(page_index).await,
        None => Ok(None),
    };
    if matches!(result, Ok(None)) {
        message::warning("Pages start at 1");
        return Ok(Step::Continue);
    }
    paged(pawmatch, result, out)
}

fn paged<G: Gateway>(
    pawmatch: &Pawmatch<G>,
    result: Result<Option<Applied>, Notification>,
    out: &mut impl Write,
) -> Result<Step> {
    match result {
        Ok(None) => Ok(Step::Continue),
        Ok(Some(applied)) => page_loaded(pawmatch, Ok(applied), out),
        Err(notice) => Ok(handle_notice(notice)),
    }
}

fn page_loaded<G: Gateway>(
    pawmatch: &Pawmatch<G>,
    result: Result<Applied, Notification>,
    out: &mut impl Write,
) -> Result<Step> {
    match result {
        Ok(Applied::Updated(status)) => {
            print_page(pawmatch, status, out)?;
            Ok(Step::Continue)
        },
        Ok(Applied::Discarded) => Ok(Step::Continue),
        Err(notice) => Ok(handle_notice(notice)),
    }
}

fn print_page<G: Gateway>(
    pawmatch: &Pawmatch<G>,
    status: PageStatus,
    out: &mut impl Write,
) -> Result<()> {
    let criteria = pawmatch.criteria();
    message::plain(format_args!(
        "Page {page}, {breed}, sorted {sort}",
        page = criteria.page_index + 1,
        breed = criteria.breed.as_deref().unwrap_or("all breeds"),
        sort = criteria.sort,
    ));

    match status {
        PageStatus::NoResults => message::info("No dogs found"),
        PageStatus::Loaded(_) => {
            let page = pawmatch.current_page();
            let table = DisplayCandidates::new(page.candidates()).with_favorites(pawmatch.favorites());
            writeln!(out, "{table}")?;
        },
    }
    Ok(())
}

/// Report a notification, ending the browsing session if it expired.
fn handle_notice(notice: Notification) -> Step {
    if notice.kind == NoticeKind::SessionExpired {
        return Step::Expired;
    }
    message::notice(&notice);
    Step::Continue
}

enum BreedChoice {
    All,
    Breed(String),
}

impl Display for BreedChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreedChoice::All => write!(f, "All breeds"),
            BreedChoice::Breed(breed) => write!(f, "{breed}"),
        }
    }
}

async fn confirm_login() -> Result<bool> {
    let again = Dialog {
        message: "Log in again?",
        help_message: None,
        typed: Confirm {
            default: Some(true),
        },
    }
    .prompt()
    .await;
    Ok(cancelled_as_none(again)?.unwrap_or(false))
}

async fn prompt_page() -> Result<Option<i64>> {
    let page = Dialog {
        message: "Page:",
        help_message: None,
        typed: Text { default: None },
    }
    .prompt()
    .await;

    let Some(page) = cancelled_as_none(page)? else {
        return Ok(None);
    };
    match page.trim().parse::<i64>() {
        Ok(page) => Ok(Some(page)),
        Err(_) => {
            message::warning(format_args!("'{page}' is not a page number"));
            Ok(None)
        },
    }
}

/// Toggle favorites among the candidates of the current page
async fn pick_favorites<G: Gateway>(pawmatch: &mut Pawmatch<G>) -> Result<()> {
    let candidates = pawmatch.current_page().candidates().to_vec();
    if candidates.is_empty() {
        message::info("No dogs on this page");
        return Ok(());
    }

    let selected = candidates
        .iter()
        .enumerate()
        .filter(|(_, candidate)| pawmatch.is_favorite(&candidate.id))
        .map(|(idx, _)| idx)
        .collect();
    let options: Vec<String> = candidates
        .iter()
        .map(|candidate| DisplayCandidate(candidate).to_string())
        .collect();

    let chosen = Dialog {
        message: "Favorites",
        help_message: Some("Space to toggle, enter to confirm"),
        typed: MultiSelect { options, selected },
    }
    .prompt()
    .await;

    let Some(chosen) = cancelled_as_none(chosen)? else {
        return Ok(());
    };

    for (idx, candidate) in candidates.into_iter().enumerate() {
        let wanted = chosen.contains(&idx);
        if wanted != pawmatch.is_favorite(&candidate.id) {
            pawmatch.toggle_favorite(candidate.id);
        }
    }
    Ok(())
}

fn show_favorites<G: Gateway>(pawmatch: &Pawmatch<G>) {
    let favorites = pawmatch.favorites();
    if favorites.is_empty() {
        message::info("No favorites yet");
        return;
    }
    message::plain(format_args!("{} favorites:", favorites.len()));
    for id in favorites.iter() {
        match pawmatch.current_page().get(id) {
            Some(candidate) => message::plain(format_args!("  {}", DisplayCandidate(candidate))),
            None => message::plain(format_args!("  {id}")),
        }
    }
}

/// Map a cancelled prompt to `None`
fn cancelled_as_none<T>(result: InquireResult<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use pawmatch_catalog::{Credentials, SearchQuery, SortOrder};
    use pawmatch_sdk::providers::gateway::{Endpoint, MockFailure, MockGateway, mock_candidate};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::utils::message::history::History;

    fn seeded_gateway() -> MockGateway {
        let gateway = MockGateway::new();
        gateway.add_candidates([
            mock_candidate("a1", "Akita"),
            mock_candidate("b1", "Boxer"),
            mock_candidate("b2", "Boxer"),
        ]);
        gateway.set_search_result(SearchQuery::page(None, 0, SortOrder::Asc), ["a1", "b1"]);
        gateway.set_search_result(SearchQuery::page(None, 1, SortOrder::Asc), ["b2"]);
        gateway.set_search_result(SearchQuery::page(None, 0, SortOrder::Desc), ["b2", "b1"]);
        gateway
    }

    async fn logged_in(gateway: &MockGateway) -> Pawmatch<MockGateway> {
        let mut pawmatch = Pawmatch::new(gateway.clone());
        pawmatch
            .login(&Credentials::new("Ada", "ada@example.com").unwrap())
            .await
            .unwrap();
        pawmatch
    }

    #[tokio::test]
    async fn refresh_prints_page() {
        let gateway = seeded_gateway();
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();

        let step = perform(&mut pawmatch, Action::Refresh, &mut out).await.unwrap();

        assert_eq!(step, Step::Continue);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("a1"), "{out}");
        assert!(out.contains("b1"), "{out}");
        assert!(
            History::global()
                .messages()
                .contains(&"Page 1, all breeds, sorted asc".to_string())
        );
    }

    #[tokio::test]
    async fn next_page_advances() {
        let gateway = seeded_gateway();
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();
        perform(&mut pawmatch, Action::Refresh, &mut out).await.unwrap();

        perform(&mut pawmatch, Action::NextPage, &mut out).await.unwrap();

        assert_eq!(pawmatch.criteria().page_index, 1);
        let ids: Vec<_> = pawmatch
            .current_page()
            .candidates()
            .iter()
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(ids, vec!["b2"]);
    }

    #[tokio::test]
    async fn previous_on_first_page_makes_no_call() {
        let gateway = seeded_gateway();
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();

        let step = perform(&mut pawmatch, Action::PreviousPage, &mut out)
            .await
            .unwrap();

        assert_eq!(step, Step::Continue);
        assert_eq!(gateway.call_count(Endpoint::Search), 0);
    }

    #[tokio::test]
    async fn go_to_page_is_one_based() {
        let gateway = seeded_gateway();
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();

        go_to_page(&mut pawmatch, 2, &mut out).await.unwrap();

        assert_eq!(pawmatch.criteria().page_index, 1);
    }

    #[tokio::test]
    async fn go_to_page_rejects_out_of_range_input() {
        let gateway = seeded_gateway();
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();

        for page in [0, -3, i64::MIN] {
            let step = go_to_page(&mut pawmatch, page, &mut out).await.unwrap();
            assert_eq!(step, Step::Continue);
        }

        assert_eq!(pawmatch.criteria().page_index, 0);
        assert_eq!(gateway.call_count(Endpoint::Search), 0);
    }

    #[tokio::test]
    async fn toggle_sort_restarts_at_first_page() {
        let gateway = seeded_gateway();
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();
        perform(&mut pawmatch, Action::Refresh, &mut out).await.unwrap();
        perform(&mut pawmatch, Action::NextPage, &mut out).await.unwrap();

        perform(&mut pawmatch, Action::ToggleSort, &mut out).await.unwrap();

        assert_eq!(pawmatch.criteria().sort, SortOrder::Desc);
        assert_eq!(pawmatch.criteria().page_index, 0);
    }

    #[tokio::test]
    async fn match_without_favorites_is_reported() {
        let gateway = seeded_gateway();
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();

        let step = perform(&mut pawmatch, Action::Match, &mut out).await.unwrap();

        assert_eq!(step, Step::Continue);
        assert_eq!(gateway.call_count(Endpoint::Match), 0);
    }

    #[tokio::test]
    async fn match_prints_result() {
        let gateway = seeded_gateway();
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();
        perform(&mut pawmatch, Action::Refresh, &mut out).await.unwrap();
        pawmatch.toggle_favorite("b1".into());
        gateway.push_match_response(Some("b1"));
        out.clear();

        perform(&mut pawmatch, Action::Match, &mut out).await.unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "dog b1 (Boxer, 3 years, 10001)\n  https://example.com/b1.jpg\n"
        );
    }

    #[tokio::test]
    async fn transient_failure_continues() {
        let gateway = seeded_gateway();
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();
        gateway.push_failure(Endpoint::Search, MockFailure::Status(503));

        let step = perform(&mut pawmatch, Action::Refresh, &mut out).await.unwrap();

        assert_eq!(step, Step::Continue);
        assert!(pawmatch.session().is_authenticated());
    }

    #[tokio::test]
    async fn expired_session_ends_browsing() {
        let gateway = seeded_gateway();
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();
        gateway.push_failure(Endpoint::Search, MockFailure::Unauthorized);

        let step = perform(&mut pawmatch, Action::NextPage, &mut out).await.unwrap();

        assert_eq!(step, Step::Expired);
        assert!(!pawmatch.session().is_authenticated());
    }

    #[tokio::test]
    async fn quit_stops() {
        let gateway = seeded_gateway();
        let mut pawmatch = logged_in(&gateway).await;

        let step = perform(&mut pawmatch, Action::Quit, &mut Vec::new())
            .await
            .unwrap();

        assert_eq!(step, Step::Quit);
        assert_eq!(gateway.calls().len(), 1);
    }
}
