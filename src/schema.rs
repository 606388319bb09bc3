use teloxide::{
    dispatching::{DpHandlerDescription, UpdateFilterExt, UpdateHandler},
    dptree::{self, Handler},
    prelude::DependencyMap,
    types::{CallbackQuery, Message, Update},
};
use tracing::instrument;

use crate::{
    callback::{acknowledge_unknown, CallbackAction},
    commands::{self, Command},
    database::connection::Connection,
    dictionary, runner,
    translator::GoogleTranslate,
    BoxedError,
};

pub fn schema() -> UpdateHandler<BoxedError> {
    dptree::entry()
        .branch(message_scheme())
        .branch(callback_query_scheme())
        .branch(Update::filter_poll_answer().endpoint(runner::poll_answer::<Connection>))
}

#[instrument(level = "debug")]
fn message_scheme() -> Handler<'static, DependencyMap, Result<(), BoxedError>, DpHandlerDescription>
{
    use dptree::case;
    tracing::debug!("Building a dispatching tree for messages");

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(commands::start::<Connection>))
        .branch(case![Command::Help].endpoint(commands::help))
        .branch(case![Command::Test].endpoint(commands::test::<Connection>))
        .branch(case![Command::Words].endpoint(commands::words::<Connection>))
        .branch(case![Command::Delete].endpoint(commands::delete::<Connection>))
        .branch(case![Command::Stop].endpoint(commands::stop::<Connection>));

    Update::filter_message()
        .branch(command_handler)
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some())
                .endpoint(dictionary::translate_word::<Connection, GoogleTranslate>),
        )
}

#[instrument(level = "debug")]
fn callback_query_scheme(
) -> Handler<'static, DependencyMap, Result<(), BoxedError>, DpHandlerDescription> {
    use dptree::case;
    tracing::debug!("Building a dispatching tree for callback queries");

    let known_actions =
        dptree::filter_map(|q: CallbackQuery| q.data.as_deref().and_then(CallbackAction::parse))
            .branch(
                case![CallbackAction::AddWord {
                    headword,
                    translation
                }]
                .endpoint(dictionary::add_word::<Connection, GoogleTranslate>),
            )
            .branch(
                case![CallbackAction::StartQuiz(quiz_type)]
                    .endpoint(runner::start_quiz::<Connection>),
            )
            .branch(
                case![CallbackAction::DeleteWord(word_id)]
                    .endpoint(dictionary::delete_word::<Connection>),
            );

    Update::filter_callback_query()
        .branch(known_actions)
        .endpoint(acknowledge_unknown)
}
