//! The PiperFlow grammar documentation and prompt assembly.
//!
//! The grammar text is sent as the system message on every completion call,
//! prefixed with a fixed instruction sentence. Neither varies between
//! requests, so [`system_message`] is computed once at
//! [`Generator`](crate::generator::Generator) construction.

/// Fixed instruction prefix for the system message.
pub const SYSTEM_PREAMBLE: &str =
    "you are business process flow generator using the following piperflow text\n\n";

/// Fixed instruction prefix for the user message.
pub const USER_PREAMBLE: &str = "generate the piperflow text for the below scenario\n\n";

/// PiperFlow syntax documentation, embedded verbatim into the system message.
pub const PIPERFLOW_GRAMMAR: &str = r#" Generate BPMN diagram using English like PiperFlow syntax
To create a process map using PiperFlow, you need to define the diagram using a specific syntax. Here is an example:

title: Sample Test Process
colourtheme: GREENTURTLE
    lane: End User
        (start) as start
        [Enter Keyword] as enter_keyword
        (end) as end
    pool: System Search
        lane: Database System
            [Login] as login
            [Search Records] as search_records
            <Result Found?> as result_found
            [Display Result] as display_result
            [Logout] as logout
        lane: Log System
            [Log Error] as log_error

    start->login->enter_keyword->search_records->result_found->display_result->logout->end
    result_found->log_error->display_result

    footer: Generated by PiperFlow

Syntax
Diagram Configurations
The PiperFlow syntax for defining a process map is as follows:

title: The title of the diagram.
footer: The footer text to display on the diagram.
width : (Optional) Specify the width of the diagram.
colourtheme: The colour theme to use
Lane & Pool Configurations
lane: The name of the lane.
pool: The name of the pool.
Element/Shape Configurations
To add elements to the lane, use one of the following tags. You place your element description within the tag:
Use ( and ) to create event element
use (start) to create a start event
use (end) to create an end event
use (@timer and ) to create a timer event. Example (@timer Trigger every 1 hour) as timer_event
use (@intermediate and ) to create an intermediate event. Example (@intermediate Message Received) as intermediate_event
use (@message and ) to create a message event
use (@signal and ) to create a signal event
use (@conditional and ) to create a conditional event
use (@link and ) to create a link event
Use [ and ] to create an activity. By default, the activity type is TASK. Example [Place Order] as place_order
use [@subprocess] to create a subprocess. Example `[@subprocess Get Approval] as get_approval``
Use < and > to create a gateway. By default, the gateway type is EXCLUSIVE. Example <Result Found?> as result_found
Use <@parallel and > to create a parallel gateway. Example <@parallel Span Out> as span_out
Use <@inclusive and > to create an inclusive gateway. Example <@inclusive Condition Met?> as condition_met
Use <@event and > to create an event gateway
Connection Configurations
To connect two elements, use ->. You can chain multiple connections using ->:
Example:
login->enter_keyword
start->login->enter_keyword->search_records->result_found->display_result->logout->end
To add label to the connection, add ":" when connecting elements.
Example:
start->login: Enter credentials
To specify the connection point manually, add connection side.
Example:
start-(bottom, top)->login
start-(bottom, top)->login: Enter credentials
Indentation is not required. However, it is recommended to use indentation to make the diagram easier to read.

currently available color themes are
Default
GREYWOOF
BLUEMOUNTAIN
ORANGEPEEL
GREENTURTLE
SUNFLOWER
PURPLERAIN
RUBYRED
TEALWATERS
SEAFOAMS
"#;

/// Build the system message: fixed preamble + grammar documentation.
///
/// Identical across all requests.
pub fn system_message() -> String {
    format!("{}{}", SYSTEM_PREAMBLE, PIPERFLOW_GRAMMAR)
}

/// Build the user message: fixed preamble + the caller's raw scenario text.
///
/// The scenario is passed through unsanitized; any length or content limit
/// is the completion provider's.
pub fn user_message(scenario: &str) -> String {
    format!("{}{}", USER_PREAMBLE, scenario)
}
